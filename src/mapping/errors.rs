use thiserror::Error;

/// Mapping-contract violations: the R2RML metadata handed to the compiler
/// is malformed or inconsistent with itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Unknown triples map `{0}`")]
    UnknownTriplesMap(String),

    #[error("Invalid template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Malformed term map in triples map `{triples_map}`: {reason}")]
    MalformedTermMap { triples_map: String, reason: String },

    #[error("Column `{column}` referenced by triples map `{triples_map}` not found in table `{table}`")]
    ColumnNotFound {
        triples_map: String,
        table: String,
        column: String,
    },

    #[error("Failed to load mapping: {0}")]
    Load(String),
}
