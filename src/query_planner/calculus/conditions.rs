//! Filter, source and assignment conditions of a calculus model.

use std::collections::{BTreeSet, HashMap};

use super::expressions::Expression;
use super::{CalculusModel, CalculusVariable, QueryModel, SourceId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationalOperator {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl RelationalOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelationalOperator::Less => "<",
            RelationalOperator::LessOrEqual => "<=",
            RelationalOperator::Greater => ">",
            RelationalOperator::GreaterOrEqual => ">=",
        }
    }

    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            RelationalOperator::Less => ordering == Less,
            RelationalOperator::LessOrEqual => ordering != Greater,
            RelationalOperator::Greater => ordering == Greater,
            RelationalOperator::GreaterOrEqual => ordering != Less,
        }
    }
}

/// Boolean predicate restricting the rows of a model.
///
/// Build composite conditions through [`FilterCondition::and`],
/// [`FilterCondition::or`] and [`FilterCondition::not`], which flatten and
/// fold constants.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    True,
    False,
    Conjunction(Vec<FilterCondition>),
    Disjunction(Vec<FilterCondition>),
    Negation(Box<FilterCondition>),
    EqualExpressions(Expression, Expression),
    EqualVariables(CalculusVariable, CalculusVariable),
    IsNull(CalculusVariable),
    Comparison {
        operator: RelationalOperator,
        left: Expression,
        right: Expression,
    },
    Like {
        expression: Expression,
        pattern: String,
    },
}

impl FilterCondition {
    pub fn constant(value: bool) -> Self {
        if value {
            FilterCondition::True
        } else {
            FilterCondition::False
        }
    }

    pub fn and(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        let mut flat: Vec<FilterCondition> = Vec::new();
        for condition in conditions {
            match condition {
                FilterCondition::True => {}
                FilterCondition::False => return FilterCondition::False,
                FilterCondition::Conjunction(children) => {
                    for child in children {
                        if !flat.contains(&child) {
                            flat.push(child);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => FilterCondition::True,
            1 => flat.remove(0),
            _ => FilterCondition::Conjunction(flat),
        }
    }

    pub fn or(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        let mut flat: Vec<FilterCondition> = Vec::new();
        for condition in conditions {
            match condition {
                FilterCondition::False => {}
                FilterCondition::True => return FilterCondition::True,
                FilterCondition::Disjunction(children) => {
                    for child in children {
                        if !flat.contains(&child) {
                            flat.push(child);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => FilterCondition::False,
            1 => flat.remove(0),
            _ => FilterCondition::Disjunction(flat),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: FilterCondition) -> Self {
        match condition {
            FilterCondition::True => FilterCondition::False,
            FilterCondition::False => FilterCondition::True,
            FilterCondition::Negation(inner) => *inner,
            other => FilterCondition::Negation(Box::new(other)),
        }
    }

    pub fn is_not_null(variable: CalculusVariable) -> Self {
        FilterCondition::not(FilterCondition::IsNull(variable))
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        FilterCondition::EqualExpressions(left, right)
    }

    /// Rebuilds composite nodes through the smart constructors.
    pub fn normalize(self) -> Self {
        match self {
            FilterCondition::Conjunction(children) => {
                FilterCondition::and(children.into_iter().map(|c| c.normalize()))
            }
            FilterCondition::Disjunction(children) => {
                FilterCondition::or(children.into_iter().map(|c| c.normalize()))
            }
            FilterCondition::Negation(inner) => FilterCondition::not(inner.normalize()),
            other => other,
        }
    }

    /// Top-level conjuncts.
    pub fn conjuncts(&self) -> Vec<&FilterCondition> {
        match self {
            FilterCondition::Conjunction(children) => {
                children.iter().flat_map(|c| c.conjuncts()).collect()
            }
            FilterCondition::True => vec![],
            other => vec![other],
        }
    }

    /// Owned top-level conjuncts; `true` has none.
    pub fn into_conjuncts(self) -> Vec<FilterCondition> {
        match self {
            FilterCondition::Conjunction(children) => children
                .into_iter()
                .flat_map(|c| c.into_conjuncts())
                .collect(),
            FilterCondition::True => vec![],
            other => vec![other],
        }
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<VariableId>) {
        match self {
            FilterCondition::True | FilterCondition::False => {}
            FilterCondition::Conjunction(children) | FilterCondition::Disjunction(children) => {
                for child in children {
                    child.collect_variables(out);
                }
            }
            FilterCondition::Negation(inner) => inner.collect_variables(out),
            FilterCondition::EqualExpressions(left, right)
            | FilterCondition::Comparison { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            FilterCondition::EqualVariables(left, right) => {
                out.insert(left.id);
                out.insert(right.id);
            }
            FilterCondition::IsNull(variable) => {
                out.insert(variable.id);
            }
            FilterCondition::Like { expression, .. } => expression.collect_variables(out),
        }
    }

    /// Replaces variables by `map`; `v = v` becomes `v IS NOT NULL`.
    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> FilterCondition {
        let var = |v: &CalculusVariable| map.get(&v.id).copied().unwrap_or(*v);
        match self {
            FilterCondition::True | FilterCondition::False => self.clone(),
            FilterCondition::Conjunction(children) => {
                FilterCondition::and(children.iter().map(|c| c.substitute(map)))
            }
            FilterCondition::Disjunction(children) => {
                FilterCondition::or(children.iter().map(|c| c.substitute(map)))
            }
            FilterCondition::Negation(inner) => FilterCondition::not(inner.substitute(map)),
            FilterCondition::EqualExpressions(left, right) => {
                FilterCondition::EqualExpressions(left.substitute(map), right.substitute(map))
            }
            FilterCondition::EqualVariables(left, right) => {
                let (left, right) = (var(left), var(right));
                if left.id == right.id {
                    FilterCondition::is_not_null(left)
                } else {
                    FilterCondition::EqualVariables(left, right)
                }
            }
            FilterCondition::IsNull(variable) => FilterCondition::IsNull(var(variable)),
            FilterCondition::Comparison {
                operator,
                left,
                right,
            } => FilterCondition::Comparison {
                operator: *operator,
                left: left.substitute(map),
                right: right.substitute(map),
            },
            FilterCondition::Like {
                expression,
                pattern,
            } => FilterCondition::Like {
                expression: expression.substitute(map),
                pattern: pattern.clone(),
            },
        }
    }
}

/// Computes a new variable of the owning model.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCondition {
    pub variable: CalculusVariable,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub variable: CalculusVariable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub id: SourceId,
    pub table: String,
    pub columns: Vec<TableColumn>,
}

impl TableSource {
    pub fn variable_of(&self, column: &str) -> Option<CalculusVariable> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.variable)
    }

    pub fn column_of(&self, variable: VariableId) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.variable.id == variable)
    }
}

/// How rows enter a model.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCondition {
    /// All columns of a table, one calculus variable per column.
    Table(TableSource),
    /// A nested model used as a derived table.
    SubModel { id: SourceId, model: Box<QueryModel> },
    /// Rows of every branch, tagged by the branch's value of `case_variable`.
    Union {
        id: SourceId,
        case_variable: CalculusVariable,
        branches: Vec<CalculusModel>,
    },
    /// Optional rows of `model` matched under `conditions`; every variable of
    /// `model` is nullable from the outside.
    LeftJoin {
        id: SourceId,
        model: Box<CalculusModel>,
        conditions: Vec<FilterCondition>,
    },
}

impl SourceCondition {
    pub fn id(&self) -> SourceId {
        match self {
            SourceCondition::Table(table) => table.id,
            SourceCondition::SubModel { id, .. }
            | SourceCondition::Union { id, .. }
            | SourceCondition::LeftJoin { id, .. } => *id,
        }
    }

    /// Variables this source makes visible to its owning model.
    pub fn provided_variables(&self) -> Vec<CalculusVariable> {
        match self {
            SourceCondition::Table(table) => table.columns.iter().map(|c| c.variable).collect(),
            SourceCondition::SubModel { model, .. } => model.variables(),
            SourceCondition::Union {
                case_variable,
                branches,
                ..
            } => {
                let mut variables = vec![*case_variable];
                for branch in branches {
                    for variable in branch.variables() {
                        if !variables.iter().any(|v| v.id == variable.id) {
                            variables.push(variable);
                        }
                    }
                }
                variables
            }
            SourceCondition::LeftJoin { model, .. } => model.variables(),
        }
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> SourceCondition {
        match self {
            SourceCondition::Table(_) => self.clone(),
            SourceCondition::SubModel { id, model } => SourceCondition::SubModel {
                id: *id,
                model: Box::new(model.substitute(map)),
            },
            SourceCondition::Union {
                id,
                case_variable,
                branches,
            } => SourceCondition::Union {
                id: *id,
                case_variable: *case_variable,
                branches: branches.iter().map(|b| b.substitute(map)).collect(),
            },
            SourceCondition::LeftJoin {
                id,
                model,
                conditions,
            } => SourceCondition::LeftJoin {
                id: *id,
                model: Box::new(model.substitute(map)),
                conditions: conditions
                    .iter()
                    .map(|c| c.substitute(map))
                    .filter(|c| *c != FilterCondition::True)
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlType;

    fn var(id: usize) -> CalculusVariable {
        CalculusVariable::new(VariableId(id), SqlType::String)
    }

    #[test]
    fn test_and_flattens_and_folds() {
        let a = FilterCondition::IsNull(var(1));
        let b = FilterCondition::IsNull(var(2));
        assert_eq!(
            FilterCondition::and(vec![
                FilterCondition::True,
                FilterCondition::and(vec![a.clone(), b.clone()]),
                a.clone(),
            ]),
            FilterCondition::Conjunction(vec![a.clone(), b.clone()])
        );
        assert_eq!(
            FilterCondition::and(vec![a.clone(), FilterCondition::False]),
            FilterCondition::False
        );
        assert_eq!(FilterCondition::and(vec![]), FilterCondition::True);
    }

    #[test]
    fn test_or_and_not_fold() {
        let a = FilterCondition::IsNull(var(1));
        assert_eq!(
            FilterCondition::or(vec![FilterCondition::False, a.clone()]),
            a.clone()
        );
        assert_eq!(
            FilterCondition::or(vec![a.clone(), FilterCondition::True]),
            FilterCondition::True
        );
        assert_eq!(FilterCondition::not(FilterCondition::not(a.clone())), a);
    }

    #[test]
    fn test_substitute_collapses_self_equality() {
        let mut map = HashMap::new();
        map.insert(VariableId(2), var(1));
        let c = FilterCondition::EqualVariables(var(1), var(2));
        assert_eq!(c.substitute(&map), FilterCondition::is_not_null(var(1)));
    }
}
