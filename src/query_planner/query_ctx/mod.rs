//! Per-compilation context.
//!
//! Holds the read-only collaborators (mapping, schema, type cache, config)
//! and the arena that allocates calculus variables and source ids. The arena
//! is append-only, so ids are unique within one compilation and the SQL
//! naming helper can key aliases on them.

use crate::config::CompilerConfig;
use crate::database::{SchemaError, SchemaProvider, SqlType, TableSchema};
use crate::mapping::{MappingError, MappingProvider, TriplesMap};
use crate::types::TypeCache;

use super::calculus::{CalculusVariable, SourceId, VariableId};

pub struct QueryContext<'a> {
    pub mapping: &'a dyn MappingProvider,
    pub schema: &'a dyn SchemaProvider,
    pub type_cache: &'a TypeCache,
    pub config: &'a CompilerConfig,
    variables: Vec<SqlType>,
    sources: usize,
}

impl<'a> QueryContext<'a> {
    pub fn new(
        mapping: &'a dyn MappingProvider,
        schema: &'a dyn SchemaProvider,
        type_cache: &'a TypeCache,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            mapping,
            schema,
            type_cache,
            config,
            variables: Vec::new(),
            sources: 0,
        }
    }

    pub fn new_variable(&mut self, sql_type: SqlType) -> CalculusVariable {
        let id = VariableId(self.variables.len());
        self.variables.push(sql_type);
        CalculusVariable::new(id, sql_type)
    }

    pub fn new_source_id(&mut self) -> SourceId {
        let id = SourceId(self.sources);
        self.sources += 1;
        id
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn table(&self, name: &str) -> Result<&'a TableSchema, SchemaError> {
        self.schema
            .table(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }

    pub fn triples_map(&self, id: &str) -> Result<&'a TriplesMap, MappingError> {
        self.mapping
            .triples_map(id)
            .ok_or_else(|| MappingError::UnknownTriplesMap(id.to_string()))
    }
}
