//! Naming helper: SQL aliases of sources and variables, and the stack of
//! model scopes a variable reference is resolved against.
//!
//! Aliases are derived from arena indices, so two structurally equal
//! sources or variables never share a name.

use std::collections::HashMap;

use crate::query_planner::calculus::{
    CalculusModel, Expression, SourceCondition, SourceId, VariableId,
};

use super::errors::SqlGeneratorError;

/// Alias of a source condition in the FROM clause.
pub fn source_alias(id: SourceId) -> String {
    format!("s{}", id)
}

/// Output column name of a calculus variable.
pub fn column_alias(id: VariableId) -> String {
    format!("c{}", id)
}

/// Column name used when a SELECT has nothing to project.
pub const PLACEHOLDER_COLUMN: &str = "c";

/// How a variable is reached from inside its owning model.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// `<source alias>.<column>`
    Reference { source: SourceId, column: String },
    /// Rendered inline as the assigned expression.
    Assigned(Expression),
}

#[derive(Debug, Default)]
pub struct Scope {
    bindings: HashMap<VariableId, Binding>,
}

impl Scope {
    pub fn of_model(model: &CalculusModel) -> Self {
        let mut bindings = HashMap::new();
        for source in &model.sources {
            match source {
                SourceCondition::Table(table) => {
                    for column in &table.columns {
                        bindings.insert(
                            column.variable.id,
                            Binding::Reference {
                                source: table.id,
                                column: column.name.clone(),
                            },
                        );
                    }
                }
                other => {
                    for variable in other.provided_variables() {
                        bindings.insert(
                            variable.id,
                            Binding::Reference {
                                source: other.id(),
                                column: column_alias(variable.id),
                            },
                        );
                    }
                }
            }
        }
        for assignment in &model.assignments {
            bindings.insert(
                assignment.variable.id,
                Binding::Assigned(assignment.expression.clone()),
            );
        }
        Scope { bindings }
    }

    pub fn get(&self, variable: VariableId) -> Option<&Binding> {
        self.bindings.get(&variable)
    }
}

/// Scopes of the currently entered models, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn enter(&mut self, model: &CalculusModel) {
        self.scopes.push(Scope::of_model(model));
    }

    pub fn leave(&mut self) {
        self.scopes.pop();
    }

    /// Binding of `variable` in the nearest scope that has one.
    pub fn resolve(&self, variable: VariableId) -> Result<Binding, SqlGeneratorError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(variable))
            .cloned()
            .ok_or(SqlGeneratorError::UnresolvedVariable(variable))
    }
}
