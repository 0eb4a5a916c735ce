//! Database-side collaborators: SQL scalar types, schema metadata and the
//! dialect abstraction that isolates every dialect-specific leaf emission
//! (identifier quoting, literals, concatenation, paging, type promotion).

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod errors;
pub mod mssql;
pub mod postgres;
pub mod schema;

pub use errors::{DialectError, SchemaError};
pub use mssql::MsSqlDialect;
pub use postgres::PostgresDialect;
pub use schema::{ColumnSchema, InMemorySchema, SchemaProvider, TableSchema};

/// SQL scalar type of a calculus variable or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    String,
    Int,
    Double,
    Bool,
    DateTime,
}

impl SqlType {
    /// Maps a native column type name (`nvarchar(50)`, `bigint`, ...) to its
    /// scalar type. Case-insensitive; length/precision arguments are ignored.
    pub fn from_native(native: &str) -> Result<Self, SchemaError> {
        let lowered = native.trim().to_lowercase();
        let base = lowered
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        match base.as_str() {
            "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "string"
            | "character" | "character varying" | "uuid" | "uniqueidentifier" => {
                Ok(SqlType::String)
            }
            "int" | "integer" | "bigint" | "smallint" | "tinyint" | "int2" | "int4" | "int8"
            | "serial" | "bigserial" => Ok(SqlType::Int),
            "float" | "real" | "double" | "double precision" | "decimal" | "numeric"
            | "money" | "float4" | "float8" => Ok(SqlType::Double),
            "bit" | "bool" | "boolean" => Ok(SqlType::Bool),
            "date" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset"
            | "timestamp" | "timestamptz" | "timestamp with time zone"
            | "timestamp without time zone" => Ok(SqlType::DateTime),
            _ => Err(SchemaError::UnknownNativeType(native.to_string())),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::Double)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::String => "string",
            SqlType::Int => "int",
            SqlType::Double => "double",
            SqlType::Bool => "bool",
            SqlType::DateTime => "datetime",
        };
        write!(f, "{}", name)
    }
}

/// Result of promoting two operand types to a common type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypePromotion {
    pub common: SqlType,
    pub cast_left: bool,
    pub cast_right: bool,
}

/// `TOP` fragment placed after `SELECT [DISTINCT]` and a trailing paging
/// clause placed after `ORDER BY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paging {
    pub top: Option<String>,
    pub suffix: Option<String>,
}

/// Leaf emission rules of a target database.
pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, identifier: &str) -> String;

    fn native_type_name(&self, sql_type: SqlType) -> &'static str;

    fn string_literal(&self, value: &str) -> String;

    fn bool_literal(&self, value: bool) -> String;

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String;

    /// Concatenates already string-typed operands.
    fn concat(&self, parts: &[String]) -> String;

    fn paging(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
        ordered: bool,
    ) -> Result<Paging, DialectError>;

    fn int_literal(&self, value: i64) -> String {
        value.to_string()
    }

    fn double_literal(&self, value: f64) -> String {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{:.1}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Case-sensitive `LIKE` of a string expression against a pattern
    /// literal.
    fn like(&self, expression: &str, pattern: &str) -> String {
        format!("{} LIKE {}", expression, pattern)
    }

    fn cast(&self, expression: &str, sql_type: SqlType) -> String {
        format!("CAST({} AS {})", expression, self.native_type_name(sql_type))
    }

    fn null_of_type(&self, sql_type: SqlType) -> String {
        self.cast("NULL", sql_type)
    }

    /// Common type of two operands compared or combined arithmetically.
    ///
    /// Numeric types widen `bool < int < double`; strings absorb everything;
    /// datetime only meets numerics through strings.
    fn common_type(&self, left: SqlType, right: SqlType) -> TypePromotion {
        fn rank(t: SqlType) -> Option<u8> {
            match t {
                SqlType::Bool => Some(0),
                SqlType::Int => Some(1),
                SqlType::Double => Some(2),
                _ => None,
            }
        }

        let common = if left == right {
            left
        } else if left == SqlType::String || right == SqlType::String {
            SqlType::String
        } else {
            match (rank(left), rank(right)) {
                (Some(l), Some(r)) => {
                    if l >= r {
                        left
                    } else {
                        right
                    }
                }
                _ => SqlType::String,
            }
        };

        TypePromotion {
            common,
            cast_left: left != common,
            cast_right: right != common,
        }
    }
}
