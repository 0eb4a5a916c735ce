use anyhow::Context;
use clap::Parser;
use r2sql::{
    compile,
    config::{CompilerConfig, DialectKind},
    database::InMemorySchema,
    mapping::R2rmlMapping,
    query_planner::query_ctx::QueryContext,
    sparql::SparqlQuery,
    types::TypeCache,
};
use std::path::PathBuf;

/// r2sql - Compiles SPARQL algebra over an R2RML mapping into SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// R2RML mapping (YAML)
    #[arg(long)]
    mapping: PathBuf,

    /// Relational schema of the mapped tables (YAML)
    #[arg(long)]
    schema: PathBuf,

    /// SPARQL algebra of the query (JSON)
    #[arg(long)]
    query: PathBuf,

    /// Compiler configuration (YAML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target dialect, overriding the configuration (mssql or postgresql)
    #[arg(long)]
    dialect: Option<DialectKind>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CompilerConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }

    let mapping = R2rmlMapping::from_yaml_file(&cli.mapping)
        .with_context(|| format!("loading mapping {}", cli.mapping.display()))?;
    let schema = InMemorySchema::from_yaml_file(&cli.schema)
        .with_context(|| format!("loading schema {}", cli.schema.display()))?;
    let query_text = std::fs::read_to_string(&cli.query)
        .with_context(|| format!("reading query {}", cli.query.display()))?;
    let query: SparqlQuery = serde_json::from_str(&query_text)
        .with_context(|| format!("parsing query {}", cli.query.display()))?;

    let type_cache = TypeCache::new();
    let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);
    let compiled = compile(query, &mut ctx)?;

    println!("{}\n", compiled.sql);
    println!("{:<20} COLUMNS", "VARIABLE");
    for binding in &compiled.bindings {
        let columns = binding
            .columns
            .iter()
            .map(|c| c.column.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("?{:<19} {}", binding.name(), columns);
    }
    Ok(())
}

fn main() {
    // Initialize logger - defaults to WARN level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
