//! Decides whether two sources over the same table denote the same row.
//!
//! Two table sources of one model can be merged when the model's top-level
//! filters equate every column of some unique key of the table between them.
//! A key column that is equal on both sides is non-NULL, so the key picks
//! exactly one row and the second source repeats the first.

use std::collections::HashMap;

use crate::database::TableSchema;
use crate::query_planner::calculus::{Expression, FilterCondition, TableSource, VariableId};

/// Equivalence classes of variables equated by a conjunction of filters.
#[derive(Debug, Default)]
pub struct SelfJoinConstraints {
    parent: HashMap<VariableId, VariableId>,
}

impl SelfJoinConstraints {
    pub fn from_filters(filters: &[FilterCondition]) -> Self {
        let mut constraints = SelfJoinConstraints::default();
        for filter in filters {
            for conjunct in filter.conjuncts() {
                match conjunct {
                    FilterCondition::EqualVariables(left, right) => {
                        constraints.union(left.id, right.id)
                    }
                    FilterCondition::EqualExpressions(left, right) => {
                        if let (
                            Expression::Column { variable: l, .. },
                            Expression::Column { variable: r, .. },
                        ) = (left, right)
                        {
                            constraints.union(l.id, r.id);
                        }
                    }
                    _ => {}
                }
            }
        }
        constraints
    }

    fn find(&self, mut variable: VariableId) -> VariableId {
        while let Some(&parent) = self.parent.get(&variable) {
            if parent == variable {
                break;
            }
            variable = parent;
        }
        variable
    }

    fn union(&mut self, left: VariableId, right: VariableId) {
        let (left, right) = (self.find(left), self.find(right));
        if left != right {
            self.parent.insert(right, left);
        }
    }

    pub fn are_equal(&self, left: VariableId, right: VariableId) -> bool {
        left == right || self.find(left) == self.find(right)
    }

    /// True when `merged` is provably the same row of `schema` as `survivor`.
    pub fn can_merge(&self, schema: &TableSchema, survivor: &TableSource, merged: &TableSource) -> bool {
        if survivor.table != merged.table {
            return false;
        }
        schema.unique_keys().iter().any(|key| {
            key.iter().all(|column| {
                match (survivor.variable_of(column), merged.variable_of(column)) {
                    (Some(left), Some(right)) => self.are_equal(left.id, right.id),
                    _ => false,
                }
            })
        })
    }
}
