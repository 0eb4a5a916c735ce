//! r2sql - SPARQL to SQL compilation over R2RML mappings
//!
//! This crate compiles SPARQL algebra into dialect-specific SQL through:
//! - Triple pattern expansion and pruning against an R2RML mapping
//! - Lowering into a relational calculus with typed RDF term encoding
//! - Algebraic optimization of the calculus
//! - SQL generation for SQL Server and PostgreSQL

use thiserror::Error;
use validator::Validate;

pub mod config;
pub mod database;
pub mod mapping;
pub mod query_planner;
pub mod rdf;
pub mod sparql;
pub mod sql_generator;
pub mod types;

use query_planner::{
    calculus::CalculusVariable, errors::QueryPlannerError, query_ctx::QueryContext,
    value_binder::ValueBinder,
};
use sparql::SparqlQuery;
use sql_generator::{naming::column_alias, SqlGeneratorError};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Planner(#[from] QueryPlannerError),

    #[error("SQL generation failed: {0}")]
    SqlGeneration(#[from] SqlGeneratorError),
}

/// A result column read by a value binder.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundColumn {
    pub variable: CalculusVariable,
    pub column: String,
}

/// How the RDF term of one solution variable is read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    pub binder: ValueBinder,
    pub columns: Vec<BoundColumn>,
}

impl OutputBinding {
    pub fn name(&self) -> &str {
        self.binder.name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<OutputBinding>,
}

/// Compiles one SPARQL query into SQL plus the binders that turn result
/// rows back into RDF terms.
pub fn compile(query: SparqlQuery, ctx: &mut QueryContext) -> Result<CompiledQuery, CompileError> {
    ctx.config.validate()?;

    let planned = query_planner::plan_query(query, ctx)?;
    let sql = sql_generator::generate_sql(&planned, ctx.config)?;

    let bindings = planned
        .binders
        .into_iter()
        .map(|binder| {
            let columns = binder
                .needed_variables()
                .into_iter()
                .map(|variable| BoundColumn {
                    variable,
                    column: column_alias(variable.id),
                })
                .collect();
            OutputBinding { binder, columns }
        })
        .collect();

    Ok(CompiledQuery { sql, bindings })
}
