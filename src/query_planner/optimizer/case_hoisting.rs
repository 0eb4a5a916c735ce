//! Distributes comparisons over CASE expressions.
//!
//! `CASE WHEN c1 THEN v1 WHEN c2 THEN v2 END = r` becomes
//! `(c1 AND v1 = r) OR (NOT c1 AND c2 AND v2 = r)`. Each branch comparison
//! can then be folded on its own by the other passes. A CASE that falls
//! through every branch is NULL, which never compares equal, so the
//! fall-through needs no disjunct.

use crate::query_planner::{
    calculus::{CaseBranch, Expression, FilterCondition, RelationalQuery},
    optimizer::{
        errors::Pass,
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
        rewriter::rewrite_query,
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct CaseHoisting;

fn hoist(
    branches: &[CaseBranch],
    compare: impl Fn(&Expression) -> FilterCondition,
) -> FilterCondition {
    let mut alternatives = Vec::with_capacity(branches.len());
    let mut earlier = Vec::new();
    for branch in branches {
        let mut conjuncts = earlier.clone();
        conjuncts.push(branch.condition.clone());
        conjuncts.push(compare(&branch.value));
        alternatives.push(FilterCondition::and(conjuncts));
        earlier.push(FilterCondition::not(branch.condition.clone()));
    }
    FilterCondition::or(alternatives)
}

impl CaseHoisting {
    pub fn new() -> Self {
        CaseHoisting
    }

    fn rewrite(condition: FilterCondition) -> FilterCondition {
        match &condition {
            FilterCondition::EqualExpressions(Expression::Case { branches, .. }, right) => {
                hoist(branches, |value| {
                    FilterCondition::equal(value.clone(), right.clone())
                })
            }
            FilterCondition::EqualExpressions(left, Expression::Case { branches, .. }) => {
                hoist(branches, |value| {
                    FilterCondition::equal(left.clone(), value.clone())
                })
            }
            FilterCondition::Comparison {
                operator,
                left: Expression::Case { branches, .. },
                right,
            } => hoist(branches, |value| FilterCondition::Comparison {
                operator: *operator,
                left: value.clone(),
                right: right.clone(),
            }),
            FilterCondition::Comparison {
                operator,
                left,
                right: Expression::Case { branches, .. },
            } => hoist(branches, |value| FilterCondition::Comparison {
                operator: *operator,
                left: left.clone(),
                right: value.clone(),
            }),
            FilterCondition::Like {
                expression: Expression::Case { branches, .. },
                pattern,
            } => hoist(branches, |value| FilterCondition::Like {
                expression: value.clone(),
                pattern: pattern.clone(),
            }),
            _ => condition,
        }
    }
}

impl RelationalOptimizerPass for CaseHoisting {
    fn pass(&self) -> Pass {
        Pass::CaseHoisting
    }

    fn optimize(
        &self,
        query: RelationalQuery,
        _ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>> {
        let rewritten = rewrite_query(query.clone(), &mut Self::rewrite);
        Ok(Transformed::compare(query, rewritten))
    }
}
