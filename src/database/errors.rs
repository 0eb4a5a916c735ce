use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Table `{0}` not found in schema")]
    TableNotFound(String),

    #[error("Unknown native SQL type `{0}` (supported: char/varchar/text, int/bigint, float/real/decimal, bit/boolean, date/datetime/timestamp)")]
    UnknownNativeType(String),

    #[error("Column `{column}` of table `{table}`: {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Failed to load schema: {0}")]
    Load(String),
}

/// Dialect-contract violations detected while emitting SQL.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DialectError {
    #[error("{dialect} requires an ORDER BY clause when OFFSET is used")]
    OffsetWithoutOrderBy { dialect: &'static str },
}
