//! Folds comparisons between two constants.

use std::cmp::Ordering;

use crate::query_planner::{
    calculus::{FilterCondition, RelationalQuery},
    optimizer::{
        errors::Pass,
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
        rewriter::rewrite_query,
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct ConstantExpressionEquality;

impl ConstantExpressionEquality {
    pub fn new() -> Self {
        ConstantExpressionEquality
    }

    /// Constants of incomparable types are left alone; the database decides.
    fn fold(condition: FilterCondition) -> FilterCondition {
        match &condition {
            FilterCondition::EqualExpressions(left, right) => {
                match (left.as_constant(), right.as_constant()) {
                    (Some(l), Some(r)) => match l.compare(r) {
                        Some(ordering) => FilterCondition::constant(ordering == Ordering::Equal),
                        None => condition,
                    },
                    _ => condition,
                }
            }
            FilterCondition::Comparison {
                operator,
                left,
                right,
            } => match (left.as_constant(), right.as_constant()) {
                (Some(l), Some(r)) => match l.compare(r) {
                    Some(ordering) => FilterCondition::constant(operator.holds(ordering)),
                    None => condition,
                },
                _ => condition,
            },
            _ => condition,
        }
    }
}

impl RelationalOptimizerPass for ConstantExpressionEquality {
    fn pass(&self) -> Pass {
        Pass::ConstantExpressionEquality
    }

    fn optimize(
        &self,
        query: RelationalQuery,
        _ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>> {
        let rewritten = rewrite_query(query.clone(), &mut Self::fold);
        Ok(Transformed::compare(query, rewritten))
    }
}
