use thiserror::Error;

use crate::database::SchemaError;
use crate::mapping::MappingError;
use crate::query_planner::optimizer::errors::OptimizerError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryPlannerError {
    /// A query or mapping shape the compiler does not handle yet.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] MappingError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Column `{0}` is not provided by the term map's source")]
    UnresolvedColumn(String),

    #[error("Variable ?{0} is already bound")]
    VariableAlreadyBound(String),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
}

impl QueryPlannerError {
    pub fn not_implemented(what: impl Into<String>) -> Self {
        QueryPlannerError::NotImplemented(what.into())
    }
}
