//! Shared employee/department mapping and schema.

use r2sql::{
    compile,
    config::CompilerConfig,
    database::InMemorySchema,
    mapping::R2rmlMapping,
    query_planner::query_ctx::QueryContext,
    sparql::{GraphPattern, PatternItem, SparqlQuery},
    types::TypeCache,
    CompileError, CompiledQuery,
};

pub const EX: &str = "http://ex.org/";

pub const MAPPING_YAML: &str = r#"
triples_maps:
  - id: Employee
    table: employees
    subject_map: { template: "http://ex.org/emp/{id}" }
    classes: ["http://ex.org/Employee"]
    predicate_object_maps:
      - predicate_map: { constant: { kind: iri, value: "http://ex.org/name" } }
        object_map: { column: name, term_type: literal }
      - predicate_map: { constant: { kind: iri, value: "http://ex.org/dept" } }
        object_map:
          parent_triples_map: Department
          join_conditions:
            - { child_column: dept_id, parent_column: id }
  - id: Department
    table: departments
    subject_map: { template: "http://ex.org/dept/{id}" }
    classes: ["http://ex.org/Department"]
    predicate_object_maps:
      - predicate_map: { constant: { kind: iri, value: "http://ex.org/label" } }
        object_map: { column: label, term_type: literal }
"#;

pub const SCHEMA_YAML: &str = r#"
tables:
  - name: employees
    columns:
      - { name: id, type: int }
      - { name: name, type: nvarchar(100) }
      - { name: dept_id, type: int }
    primary_key: [id]
  - name: departments
    columns:
      - { name: id, type: int }
      - { name: label, type: nvarchar(100) }
    primary_key: [id]
"#;

/// Cities keyed by their name, with a self-reference on the same row.
pub const CITY_MAPPING_YAML: &str = r#"
triples_maps:
  - id: City
    table: cities
    subject_map: { template: "http://ex.org/city/{name}" }
    predicate_object_maps:
      - predicate_map: { constant: { kind: iri, value: "http://ex.org/population" } }
        object_map: { column: population, term_type: literal }
      - predicate_map: { constant: { kind: iri, value: "http://ex.org/self" } }
        object_map:
          parent_triples_map: City
"#;

pub const CITY_SCHEMA_YAML: &str = r#"
tables:
  - name: cities
    columns:
      - { name: name, type: nvarchar(100) }
      - { name: population, type: int }
    primary_key: [name]
"#;

pub fn iri(local: &str) -> PatternItem {
    PatternItem::Node(r2sql::rdf::RdfNode::iri(format!("{}{}", EX, local)))
}

pub fn var(name: &str) -> PatternItem {
    PatternItem::variable(name)
}

pub fn triple(subject: PatternItem, predicate: PatternItem, object: PatternItem) -> GraphPattern {
    GraphPattern::triple(subject, predicate, object)
}

pub fn compile_with(query: SparqlQuery, config: &CompilerConfig) -> Result<CompiledQuery, CompileError> {
    let mapping = R2rmlMapping::from_yaml_str(MAPPING_YAML).expect("mapping fixture");
    let schema = InMemorySchema::from_yaml_str(SCHEMA_YAML).expect("schema fixture");
    let type_cache = TypeCache::new();
    let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, config);
    compile(query, &mut ctx)
}

pub fn compile_default(query: SparqlQuery) -> Result<CompiledQuery, CompileError> {
    compile_with(query, &CompilerConfig::default())
}

pub fn compile_cities(query: SparqlQuery) -> Result<CompiledQuery, CompileError> {
    let mapping = R2rmlMapping::from_yaml_str(CITY_MAPPING_YAML).expect("city mapping fixture");
    let schema = InMemorySchema::from_yaml_str(CITY_SCHEMA_YAML).expect("city schema fixture");
    let type_cache = TypeCache::new();
    let config = CompilerConfig::default();
    let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);
    compile(query, &mut ctx)
}
