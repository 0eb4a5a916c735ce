use thiserror::Error;

use crate::database::DialectError;
use crate::query_planner::calculus::VariableId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlGeneratorError {
    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error("Calculus variable {0} is not provided by any enclosing model")]
    UnresolvedVariable(VariableId),
}
