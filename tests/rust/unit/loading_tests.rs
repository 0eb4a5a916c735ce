//! Loading mappings, schemas, configurations and queries from files.

#[cfg(test)]
mod loading_tests {
    use std::fs;
    use std::path::Path;

    use r2sql::{
        compile,
        config::{CompilerConfig, DialectKind},
        database::{InMemorySchema, SchemaProvider},
        mapping::{MappingProvider, R2rmlMapping},
        query_planner::query_ctx::QueryContext,
        sparql::SparqlQuery,
        types::TypeCache,
    };

    const MAPPING: &str = r#"
triples_maps:
  - id: Product
    table: products
    subject_map: { template: "http://shop.example/product/{sku}" }
    classes: ["http://shop.example/Product"]
    predicate_object_maps:
      - predicate_map: { constant: { kind: iri, value: "http://shop.example/title" } }
        object_map: { column: title, term_type: literal }
"#;

    const SCHEMA: &str = r#"
tables:
  - name: products
    columns:
      - { name: sku, type: int }
      - { name: title, type: nvarchar(200) }
    primary_key: [sku]
"#;

    const CONFIG: &str = "dialect: postgresql\ndefault_schema: shop\n";

    const QUERY: &str = r#"{
        "select": {
            "inner": {"pattern": {"triple": {
                "subject": {"variable": "p"},
                "predicate": {"node": {"kind": "iri", "value": "http://shop.example/title"}},
                "object": {"variable": "t"}
            }}},
            "variables": ["t"]
        }
    }"#;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_all_inputs_and_compile() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mapping = R2rmlMapping::from_yaml_file(write(dir.path(), "mapping.yaml", MAPPING))?;
        let schema = InMemorySchema::from_yaml_file(write(dir.path(), "schema.yaml", SCHEMA))?;
        let config = CompilerConfig::from_yaml_file(write(dir.path(), "config.yaml", CONFIG))?;
        let query_text = fs::read_to_string(write(dir.path(), "query.json", QUERY))?;
        let query: SparqlQuery = serde_json::from_str(&query_text)?;

        assert_eq!(mapping.triples_maps().len(), 1);
        assert!(schema.table("products").is_some());
        assert_eq!(config.dialect, DialectKind::PostgreSql);

        let type_cache = TypeCache::new();
        let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);
        let compiled = compile(query, &mut ctx)?;

        assert!(compiled.sql.contains("FROM \"shop\".\"products\""));
        assert_eq!(compiled.bindings.len(), 1);
        assert_eq!(compiled.bindings[0].name(), "t");
        Ok(())
    }

    #[test]
    fn test_missing_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = R2rmlMapping::from_yaml_file(dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "schema.yaml", "tables: [ { name: 3 ");
        assert!(InMemorySchema::from_yaml_file(path).is_err());
    }

    #[test]
    fn test_config_file_keeps_defaults_for_omitted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.yaml", "sparql_pruning: false\n");
        let config = CompilerConfig::from_yaml_file(path).unwrap();
        assert!(!config.sparql_pruning);
        assert!(config.self_join_elimination);
        assert_eq!(config.max_optimizer_rounds, 4);
    }

    #[test]
    fn test_query_with_modifiers_from_json() {
        let json = r#"{
            "slice": {
                "inner": {"distinct": {"inner": {"pattern": {"triple": {
                    "subject": {"variable": "p"},
                    "predicate": {"node": {"kind": "iri", "value": "http://shop.example/title"}},
                    "object": {"variable": "t"}
                }}}}},
                "limit": 3
            }
        }"#;
        let query: SparqlQuery = serde_json::from_str(json).unwrap();
        match query {
            SparqlQuery::Slice {
                inner,
                offset,
                limit,
            } => {
                assert_eq!(offset, None);
                assert_eq!(limit, Some(3));
                assert!(matches!(*inner, SparqlQuery::Distinct { .. }));
            }
            other => panic!("unexpected query {:?}", other),
        }
    }
}
