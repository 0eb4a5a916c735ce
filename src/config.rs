use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::database::{MsSqlDialect, PostgresDialect, SqlDialect};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

static MSSQL: MsSqlDialect = MsSqlDialect;
static POSTGRES: PostgresDialect = PostgresDialect;

/// Target SQL dialect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    MsSql,
    PostgreSql,
}

impl DialectKind {
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            DialectKind::MsSql => &MSSQL,
            DialectKind::PostgreSql => &POSTGRES,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown dialect `{0}` (expected `mssql` or `postgresql`)")]
pub struct UnknownDialect(String);

impl FromStr for DialectKind {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(DialectKind::MsSql),
            "postgresql" | "postgres" => Ok(DialectKind::PostgreSql),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Compiler configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// SQL dialect the generated text targets
    pub dialect: DialectKind,

    /// Upper bound on join-of-union combinations examined by cartesian
    /// pruning; larger products are left unpruned
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Max cartesian combinations must be between 1 and 1000000"
    ))]
    pub max_cartesian_combinations: usize,

    /// Rounds of the relational optimizer pipeline per lowered node
    #[validate(range(
        min = 1,
        max = 64,
        message = "Max optimizer rounds must be between 1 and 64"
    ))]
    pub max_optimizer_rounds: usize,

    /// Whether the SPARQL-level pruning passes run
    pub sparql_pruning: bool,

    /// Whether self-join elimination runs
    pub self_join_elimination: bool,

    /// Schema qualifier prepended to table names
    #[validate(length(min = 1, message = "Default schema cannot be empty"))]
    pub default_schema: Option<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::MsSql,
            max_cartesian_combinations: 4096,
            max_optimizer_rounds: 4,
            sparql_pruning: true,
            self_join_elimination: true,
            default_schema: None,
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            dialect: parse_env_var("R2SQL_DIALECT", "mssql")?,
            max_cartesian_combinations: parse_env_var("R2SQL_MAX_CARTESIAN_COMBINATIONS", "4096")?,
            max_optimizer_rounds: parse_env_var("R2SQL_MAX_OPTIMIZER_ROUNDS", "4")?,
            sparql_pruning: parse_env_var("R2SQL_SPARQL_PRUNING", "true")?,
            self_join_elimination: parse_env_var("R2SQL_SELF_JOIN_ELIMINATION", "true")?,
            default_schema: env::var("R2SQL_DEFAULT_SCHEMA").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect.dialect()
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
