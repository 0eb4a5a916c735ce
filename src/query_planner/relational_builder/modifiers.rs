//! Solution modifiers: projection, ordering, slicing and DISTINCT.
//!
//! Modifiers accumulate on a single [`ModifiedCalculusModel`] as long as the
//! SQL evaluation order allows it. A model that is already sliced is nested
//! as a sub-model before ordering or DISTINCT is applied on top of it.

use crate::query_planner::calculus::{
    ModifiedCalculusModel, Ordering, QueryModel, RelationalQuery,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::lowering::lower_sparql_expression;
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::ValueBinder;
use crate::sparql::OrderCondition;

use super::into_plain;

fn into_modified(model: QueryModel) -> ModifiedCalculusModel {
    match model {
        QueryModel::Plain(model) => ModifiedCalculusModel::new(model),
        QueryModel::Modified(modified) => modified,
    }
}

/// A modified model whose slice, if any, is evaluated below whatever gets
/// applied next.
fn unsliced(model: QueryModel, ctx: &mut QueryContext) -> ModifiedCalculusModel {
    match model {
        QueryModel::Modified(modified) if modified.is_sliced() => {
            ModifiedCalculusModel::new(into_plain(QueryModel::Modified(modified), ctx))
        }
        other => into_modified(other),
    }
}

/// Keeps the binders of `variables` in projection order; a variable the
/// pattern never binds gets an empty binder.
pub fn build_select(inner: RelationalQuery, variables: &[String]) -> RelationalQuery {
    let binders = variables
        .iter()
        .map(|name| {
            inner
                .binder(name)
                .cloned()
                .unwrap_or_else(|| ValueBinder::empty(name.as_str()))
        })
        .collect();
    RelationalQuery::new(inner.model, binders)
}

/// Sorts on the category slot first, then on every payload slot that is
/// not statically known.
pub fn build_order_by(
    inner: RelationalQuery,
    conditions: &[OrderCondition],
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let mut ordering = Vec::new();
    for condition in conditions {
        let set = lower_sparql_expression(&condition.expression, &inner.binders, ctx)?;
        for slot in [
            &set.type_category,
            &set.numeric,
            &set.boolean,
            &set.datetime,
            &set.string,
        ] {
            if slot.as_constant().is_some() || slot.is_null() {
                continue;
            }
            ordering.push(Ordering {
                expression: slot.clone(),
                descending: condition.descending,
            });
        }
    }

    let mut modified = unsliced(inner.model, ctx);
    ordering.extend(std::mem::take(&mut modified.ordering));
    modified.ordering = ordering;
    Ok(RelationalQuery::new(
        QueryModel::Modified(modified),
        inner.binders,
    ))
}

pub fn build_slice(
    inner: RelationalQuery,
    offset: Option<usize>,
    limit: Option<usize>,
) -> RelationalQuery {
    let mut modified = into_modified(inner.model);
    modified.merge_slice(offset, limit);
    RelationalQuery::new(QueryModel::Modified(modified), inner.binders)
}

pub fn build_distinct(inner: RelationalQuery, ctx: &mut QueryContext) -> RelationalQuery {
    let mut modified = unsliced(inner.model, ctx);
    modified.distinct = true;
    RelationalQuery::new(QueryModel::Modified(modified), inner.binders)
}
