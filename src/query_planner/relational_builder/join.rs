//! Join, left join and union lowering.

use crate::database::SqlType;
use crate::query_planner::calculus::{
    AssignmentCondition, CalculusModel, Expression, FilterCondition, QueryModel, RelationalQuery,
    SourceCondition,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::lowering::{create_join_equal_condition, lower_sparql_condition};
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::{SwitchCase, ValueBinder};
use crate::sparql::SparqlExpression;

use super::into_plain;

/// Coalesce of the bound-capable binders of one variable.
fn coalesce(name: &str, binders: Vec<ValueBinder>) -> ValueBinder {
    let mut binders: Vec<ValueBinder> = binders
        .into_iter()
        .filter(|b| !matches!(b, ValueBinder::Empty { .. }))
        .collect();
    match binders.len() {
        0 => ValueBinder::empty(name),
        1 => binders.remove(0),
        _ => ValueBinder::Coalesce {
            name: name.to_string(),
            binders,
        },
    }
}

/// Inner join of all children: their conditions are concatenated and every
/// repeated variable adds a join-equality filter against the binders seen
/// so far.
pub fn build_join(
    children: Vec<RelationalQuery>,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let mut sources = Vec::new();
    let mut filters = Vec::new();
    let mut assignments = Vec::new();
    let mut join_filters = Vec::new();
    let mut groups: Vec<(String, Vec<ValueBinder>)> = Vec::new();

    for child in children {
        let model = into_plain(child.model, ctx);
        sources.extend(model.sources);
        filters.extend(model.filters);
        assignments.extend(model.assignments);

        for binder in child.binders {
            match groups.iter_mut().find(|group| group.0 == binder.name()) {
                Some((name, group)) => {
                    let previous = coalesce(name, group.clone());
                    join_filters.push(create_join_equal_condition(&previous, &binder, ctx)?);
                    group.push(binder);
                }
                None => groups.push((binder.name().to_string(), vec![binder])),
            }
        }
    }
    filters.extend(join_filters);

    let binders = groups
        .into_iter()
        .map(|(name, group)| coalesce(&name, group))
        .collect();
    Ok(RelationalQuery::new(
        QueryModel::Plain(CalculusModel::new(sources, filters, assignments)),
        binders,
    ))
}

/// Left join: the right side becomes a left-join source whose conditions
/// are the join equalities of the shared variables and the optional filter.
pub fn build_left_join(
    left: RelationalQuery,
    right: RelationalQuery,
    condition: Option<&SparqlExpression>,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let left_model = into_plain(left.model, ctx);
    let right_model = into_plain(right.model, ctx);

    let mut binders = left.binders;
    let mut conditions = Vec::new();
    for binder in right.binders {
        match binders.iter_mut().find(|b| b.name() == binder.name()) {
            Some(existing) => {
                conditions.push(create_join_equal_condition(existing, &binder, ctx)?);
                let name = binder.name().to_string();
                *existing = coalesce(&name, vec![existing.clone(), binder]);
            }
            None => binders.push(binder),
        }
    }
    if let Some(expression) = condition {
        conditions.push(lower_sparql_condition(expression, &binders, ctx)?.into_filter());
    }

    let conditions = FilterCondition::and(conditions).into_conjuncts();

    let mut sources = left_model.sources;
    sources.push(SourceCondition::LeftJoin {
        id: ctx.new_source_id(),
        model: Box::new(right_model),
        conditions,
    });
    Ok(RelationalQuery::new(
        QueryModel::Plain(CalculusModel::new(
            sources,
            left_model.filters,
            left_model.assignments,
        )),
        binders,
    ))
}

/// Union: every branch assigns its index to a shared case variable and the
/// binders switch on it.
pub fn build_union(branches: Vec<RelationalQuery>, ctx: &mut QueryContext) -> RelationalQuery {
    let case_variable = ctx.new_variable(SqlType::Int);
    let mut models = Vec::with_capacity(branches.len());
    let mut groups: Vec<(String, Vec<SwitchCase>)> = Vec::new();

    for (index, branch) in branches.into_iter().enumerate() {
        let case_value = index as i64;
        let model = into_plain(branch.model, ctx);
        let mut assignments = model.assignments;
        assignments.push(AssignmentCondition {
            variable: case_variable,
            expression: Expression::int(case_value),
        });
        models.push(CalculusModel::new(model.sources, model.filters, assignments));

        for binder in branch.binders {
            let case = SwitchCase { case_value, binder };
            match groups.iter_mut().find(|group| group.0 == case.binder.name()) {
                Some((_, cases)) => cases.push(case),
                None => groups.push((case.binder.name().to_string(), vec![case])),
            }
        }
    }

    let binders = groups
        .into_iter()
        .map(|(name, cases)| ValueBinder::Switch {
            name,
            case_variable,
            cases,
        })
        .collect();
    let source = SourceCondition::Union {
        id: ctx.new_source_id(),
        case_variable,
        branches: models,
    };
    RelationalQuery::new(
        QueryModel::Plain(CalculusModel::new(vec![source], vec![], vec![])),
        binders,
    )
}
