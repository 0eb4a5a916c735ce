//! Lowering of SPARQL algebra into a [`RelationalQuery`].
//!
//! The builder walks the algebra bottom-up. Every node is lowered from the
//! already lowered and optimized results of its children, then passed
//! through the relational optimizer pipeline before it is returned.

use crate::query_planner::calculus::{
    CalculusModel, FilterCondition, QueryModel, RelationalQuery, SourceCondition,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::optimizer;
use crate::query_planner::query_ctx::QueryContext;
use crate::sparql::{GraphPattern, SparqlQuery};

pub mod filter;
pub mod join;
pub mod modifiers;
pub mod triple_pattern;

/// Lowers a query with its solution modifiers.
pub fn build_relational_query(
    query: &SparqlQuery,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let built = match query {
        SparqlQuery::Pattern(pattern) => return build_graph_pattern(pattern, ctx),
        SparqlQuery::Select { inner, variables } => {
            modifiers::build_select(build_relational_query(inner, ctx)?, variables)
        }
        SparqlQuery::OrderBy { inner, conditions } => {
            let inner = build_relational_query(inner, ctx)?;
            modifiers::build_order_by(inner, conditions, ctx)?
        }
        SparqlQuery::Slice {
            inner,
            offset,
            limit,
        } => {
            let inner = build_relational_query(inner, ctx)?;
            modifiers::build_slice(inner, *offset, *limit)
        }
        SparqlQuery::Distinct { inner } => {
            let inner = build_relational_query(inner, ctx)?;
            modifiers::build_distinct(inner, ctx)
        }
    };
    optimize(built, ctx)
}

/// Lowers a graph pattern.
pub fn build_graph_pattern(
    pattern: &GraphPattern,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let built = match pattern {
        GraphPattern::Empty => {
            RelationalQuery::new(QueryModel::Plain(CalculusModel::default()), vec![])
        }
        GraphPattern::NotMatching => RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(vec![], vec![FilterCondition::False], vec![])),
            vec![],
        ),
        GraphPattern::Filter { inner, expression } => {
            let inner = build_graph_pattern(inner, ctx)?;
            filter::build_filter(inner, expression, ctx)?
        }
        GraphPattern::Join(children) => {
            let children = children
                .iter()
                .map(|child| build_graph_pattern(child, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            join::build_join(children, ctx)?
        }
        GraphPattern::LeftJoin {
            left,
            right,
            condition,
        } => {
            let left = build_graph_pattern(left, ctx)?;
            let right = build_graph_pattern(right, ctx)?;
            join::build_left_join(left, right, condition.as_ref(), ctx)?
        }
        GraphPattern::Minus { .. } => {
            return Err(QueryPlannerError::not_implemented("MINUS graph patterns"))
        }
        GraphPattern::Union(branches) => {
            let branches = branches
                .iter()
                .map(|branch| build_graph_pattern(branch, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            join::build_union(branches, ctx)
        }
        GraphPattern::Triple(triple) => {
            return Err(QueryPlannerError::not_implemented(format!(
                "triple pattern not restricted to a triples map: {:?}",
                triple
            )))
        }
        GraphPattern::RestrictedTriple(triple) => {
            triple_pattern::build_restricted_triple(triple, ctx)?
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            let inner = build_graph_pattern(inner, ctx)?;
            filter::build_extend(inner, variable, expression, ctx)?
        }
    };
    optimize(built, ctx)
}

fn optimize(query: RelationalQuery, ctx: &QueryContext) -> Result<RelationalQuery, QueryPlannerError> {
    Ok(optimizer::optimize_relational(query, ctx)?)
}

/// The plain model of `model`, nesting a modified model as a sub-model
/// source.
pub(crate) fn into_plain(model: QueryModel, ctx: &mut QueryContext) -> CalculusModel {
    match model {
        QueryModel::Plain(model) => model,
        QueryModel::Modified(modified) => CalculusModel::new(
            vec![SourceCondition::SubModel {
                id: ctx.new_source_id(),
                model: Box::new(QueryModel::Modified(modified)),
            }],
            vec![],
            vec![],
        ),
    }
}
