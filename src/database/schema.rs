//! Relational schema metadata: tables, column types, nullability and keys.
//!
//! # Example
//!
//! ```yaml
//! tables:
//!   - name: employees
//!     columns:
//!       - { name: id, type: int, nullable: false }
//!       - { name: name, type: nvarchar(100) }
//!     primary_key: [id]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::errors::SchemaError;
use super::SqlType;

/// Read-only table metadata lookup.
pub trait SchemaProvider: Send + Sync {
    fn table(&self, name: &str) -> Option<&TableSchema>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnDef {
    name: String,
    #[serde(rename = "type")]
    native_type: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColumnDef")]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl TryFrom<ColumnDef> for ColumnSchema {
    type Error = SchemaError;

    fn try_from(def: ColumnDef) -> Result<Self, Self::Error> {
        Ok(ColumnSchema {
            sql_type: SqlType::from_native(&def.native_type)?,
            name: def.name,
            nullable: def.nullable,
        })
    }
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, sql_type: SqlType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: vec![],
            unique_keys: vec![],
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_unique_key(mut self, columns: &[&str]) -> Self {
        self.unique_keys
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key (if declared) followed by the unique keys.
    pub fn unique_keys(&self) -> Vec<&[String]> {
        let mut keys = Vec::new();
        if !self.primary_key.is_empty() {
            keys.push(self.primary_key.as_slice());
        }
        keys.extend(
            self.unique_keys
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.as_slice()),
        );
        keys
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for key in self.unique_keys() {
            for column in key {
                if self.column(column).is_none() {
                    return Err(SchemaError::InvalidColumn {
                        table: self.name.clone(),
                        column: column.clone(),
                        reason: "key column is not declared".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySchema {
    pub tables: Vec<TableSchema>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl InMemorySchema {
    pub fn new(tables: Vec<TableSchema>) -> Result<Self, SchemaError> {
        for table in &tables {
            table.validate()?;
        }
        let index = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Ok(Self { tables, index })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let parsed: InMemorySchema =
            serde_yaml::from_str(yaml).map_err(|e| SchemaError::Load(e.to_string()))?;
        Self::new(parsed.tables)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SchemaError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }
}

impl SchemaProvider for InMemorySchema {
    fn table(&self, name: &str) -> Option<&TableSchema> {
        self.index.get(name).map(|&i| &self.tables[i])
    }
}
