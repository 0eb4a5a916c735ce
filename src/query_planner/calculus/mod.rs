//! Relational calculus: the SQL-shaped intermediate representation.
//!
//! A [`CalculusModel`] is a set of source conditions (how rows enter), filter
//! conditions (which rows survive) and assignment conditions (computed
//! variables). Variables are arena-allocated by the query context and
//! identified by [`VariableId`]; models are plain values and every rewrite
//! produces a new one.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::database::SqlType;

use super::value_binder::ValueBinder;

pub mod conditions;
pub mod expressions;

pub use conditions::{
    AssignmentCondition, FilterCondition, RelationalOperator, SourceCondition, TableColumn,
    TableSource,
};
pub use expressions::{BinaryOperator, CaseBranch, Constant, Expression, ExpressionsSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed slot bound to one source column or one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalculusVariable {
    pub id: VariableId,
    pub sql_type: SqlType,
}

impl CalculusVariable {
    pub fn new(id: VariableId, sql_type: SqlType) -> Self {
        Self { id, sql_type }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculusModel {
    pub sources: Vec<SourceCondition>,
    pub filters: Vec<FilterCondition>,
    pub assignments: Vec<AssignmentCondition>,
}

impl CalculusModel {
    /// Builds a model, normalizing the filter list: top-level conjunctions
    /// are split, `true` filters and duplicates dropped, and a `false`
    /// filter absorbs the others.
    pub fn new(
        sources: Vec<SourceCondition>,
        filters: Vec<FilterCondition>,
        assignments: Vec<AssignmentCondition>,
    ) -> Self {
        Self {
            sources,
            filters: normalize_filters(filters),
            assignments,
        }
    }

    pub fn with_filters(self, filters: Vec<FilterCondition>) -> Self {
        let mut all = self.filters;
        all.extend(filters);
        Self::new(self.sources, all, self.assignments)
    }

    pub fn assignment_of(&self, variable: VariableId) -> Option<&AssignmentCondition> {
        self.assignments.iter().find(|a| a.variable.id == variable)
    }

    /// Variables provided by the sources and assignments of this model.
    pub fn variables(&self) -> Vec<CalculusVariable> {
        let mut variables: Vec<CalculusVariable> = Vec::new();
        let mut seen = BTreeSet::new();
        for source in &self.sources {
            for variable in source.provided_variables() {
                if seen.insert(variable.id) {
                    variables.push(variable);
                }
            }
        }
        for assignment in &self.assignments {
            if seen.insert(assignment.variable.id) {
                variables.push(assignment.variable);
            }
        }
        variables
    }

    /// Every variable referenced by a condition or assignment anywhere in
    /// this model or its nested models.
    pub fn collect_referenced(&self, out: &mut BTreeSet<VariableId>) {
        for filter in &self.filters {
            filter.collect_variables(out);
        }
        for assignment in &self.assignments {
            assignment.expression.collect_variables(out);
        }
        for source in &self.sources {
            match source {
                SourceCondition::Table(_) => {}
                SourceCondition::SubModel { model, .. } => model.collect_referenced(out),
                SourceCondition::Union { branches, .. } => {
                    for branch in branches {
                        branch.collect_referenced(out);
                    }
                }
                SourceCondition::LeftJoin {
                    model, conditions, ..
                } => {
                    model.collect_referenced(out);
                    for condition in conditions {
                        condition.collect_variables(out);
                    }
                }
            }
        }
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> CalculusModel {
        CalculusModel::new(
            self.sources.iter().map(|s| s.substitute(map)).collect(),
            self.filters.iter().map(|f| f.substitute(map)).collect(),
            self.assignments
                .iter()
                .map(|a| AssignmentCondition {
                    variable: a.variable,
                    expression: a.expression.substitute(map),
                })
                .collect(),
        )
    }
}

fn normalize_filters(filters: Vec<FilterCondition>) -> Vec<FilterCondition> {
    FilterCondition::and(filters).into_conjuncts()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expression: Expression,
    pub descending: bool,
}

/// A model with solution modifiers applied on top.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedCalculusModel {
    pub model: CalculusModel,
    pub ordering: Vec<Ordering>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub distinct: bool,
}

impl ModifiedCalculusModel {
    pub fn new(model: CalculusModel) -> Self {
        Self {
            model,
            ordering: vec![],
            limit: None,
            offset: None,
            distinct: false,
        }
    }

    pub fn is_sliced(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Applies a further `OFFSET new_offset LIMIT new_limit` on top of the
    /// current slice.
    pub fn merge_slice(&mut self, new_offset: Option<usize>, new_limit: Option<usize>) {
        let added_offset = new_offset.unwrap_or(0);
        let remaining = self.limit.map(|l| l.saturating_sub(added_offset));
        self.limit = match (remaining, new_limit) {
            (Some(r), Some(n)) => Some(r.min(n)),
            (Some(r), None) => Some(r),
            (None, n) => n,
        };
        let offset = self.offset.unwrap_or(0) + added_offset;
        self.offset = if offset == 0 && self.offset.is_none() && new_offset.is_none() {
            None
        } else {
            Some(offset)
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryModel {
    Plain(CalculusModel),
    Modified(ModifiedCalculusModel),
}

impl QueryModel {
    pub fn model(&self) -> &CalculusModel {
        match self {
            QueryModel::Plain(model) => model,
            QueryModel::Modified(modified) => &modified.model,
        }
    }

    pub fn model_mut(&mut self) -> &mut CalculusModel {
        match self {
            QueryModel::Plain(model) => model,
            QueryModel::Modified(modified) => &mut modified.model,
        }
    }

    pub fn variables(&self) -> Vec<CalculusVariable> {
        self.model().variables()
    }

    pub fn collect_referenced(&self, out: &mut BTreeSet<VariableId>) {
        self.model().collect_referenced(out);
        if let QueryModel::Modified(modified) = self {
            for ordering in &modified.ordering {
                ordering.expression.collect_variables(out);
            }
        }
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> QueryModel {
        match self {
            QueryModel::Plain(model) => QueryModel::Plain(model.substitute(map)),
            QueryModel::Modified(modified) => QueryModel::Modified(ModifiedCalculusModel {
                model: modified.model.substitute(map),
                ordering: modified
                    .ordering
                    .iter()
                    .map(|o| Ordering {
                        expression: o.expression.substitute(map),
                        descending: o.descending,
                    })
                    .collect(),
                limit: modified.limit,
                offset: modified.offset,
                distinct: modified.distinct,
            }),
        }
    }
}

/// A model plus the value binders of the solution variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalQuery {
    pub model: QueryModel,
    pub binders: Vec<ValueBinder>,
}

impl RelationalQuery {
    pub fn new(model: QueryModel, binders: Vec<ValueBinder>) -> Self {
        Self { model, binders }
    }

    pub fn binder(&self, name: &str) -> Option<&ValueBinder> {
        self.binders.iter().find(|b| b.name() == name)
    }

    /// Variables the binders need to materialize their terms, in first-use
    /// order.
    pub fn binder_variables(&self) -> Vec<CalculusVariable> {
        let mut seen = BTreeSet::new();
        let mut variables = Vec::new();
        for binder in &self.binders {
            for variable in binder.needed_variables() {
                if seen.insert(variable.id) {
                    variables.push(variable);
                }
            }
        }
        variables
    }

    /// Variables referenced anywhere in the query, binders included.
    pub fn referenced_variables(&self) -> BTreeSet<VariableId> {
        let mut out: BTreeSet<VariableId> =
            self.binder_variables().into_iter().map(|v| v.id).collect();
        self.model.collect_referenced(&mut out);
        out
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> RelationalQuery {
        RelationalQuery {
            model: self.model.substitute(map),
            binders: self.binders.iter().map(|b| b.substitute(map)).collect(),
        }
    }
}
