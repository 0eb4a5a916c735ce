//! End-to-end compilation of basic graph patterns and modifiers.

#[cfg(test)]
mod compile_tests {
    use r2sql::{
        config::{CompilerConfig, DialectKind},
        query_planner::errors::QueryPlannerError,
        rdf::{vocab, RdfNode},
        sparql::{GraphPattern, OrderCondition, PatternItem, SparqlExpression, SparqlQuery},
        sql_generator::SqlGeneratorError,
        CompileError,
    };

    use super::super::fixtures::*;

    fn employees_named() -> GraphPattern {
        triple(var("s"), iri("name"), var("n"))
    }

    #[test]
    fn test_class_pattern_reads_one_table() {
        let query = SparqlQuery::Pattern(triple(
            var("s"),
            PatternItem::Node(RdfNode::iri(vocab::RDF_TYPE)),
            iri("Employee"),
        ));
        let compiled = compile_default(query).unwrap();

        assert_eq!(compiled.sql.matches("[employees]").count(), 1);
        assert!(!compiled.sql.contains("[departments]"));
        assert!(!compiled.sql.contains("UNION"));
        assert_eq!(compiled.sql.matches("IS NOT NULL").count(), 1);

        assert_eq!(compiled.bindings.len(), 1);
        let binding = &compiled.bindings[0];
        assert_eq!(binding.name(), "s");
        assert_eq!(binding.columns.len(), 1);
        assert!(compiled
            .sql
            .contains(&format!("AS [{}]", binding.columns[0].column)));
    }

    #[test]
    fn test_every_bound_column_is_projected() {
        let query = SparqlQuery::Pattern(GraphPattern::Join(vec![
            employees_named(),
            triple(var("s"), iri("dept"), var("d")),
        ]));
        let compiled = compile_default(query).unwrap();

        let mut names: Vec<&str> = compiled.bindings.iter().map(|b| b.name()).collect();
        names.sort();
        assert_eq!(names, vec!["d", "n", "s"]);
        for binding in &compiled.bindings {
            for column in &binding.columns {
                assert!(
                    compiled.sql.contains(&format!("AS [{}]", column.column)),
                    "column {} of ?{} is not projected:\n{}",
                    column.column,
                    binding.name(),
                    compiled.sql
                );
            }
        }
    }

    #[test]
    fn test_self_join_on_subject_key_is_merged() {
        let query = SparqlQuery::Pattern(GraphPattern::Join(vec![
            employees_named(),
            triple(var("s"), iri("dept"), var("d")),
        ]));
        let compiled = compile_default(query).unwrap();
        assert_eq!(compiled.sql.matches("[employees]").count(), 1);
        assert!(!compiled.sql.contains("INNER JOIN"));
    }

    #[test]
    fn test_self_join_elimination_can_be_disabled() {
        let query = SparqlQuery::Pattern(GraphPattern::Join(vec![
            employees_named(),
            triple(var("s"), iri("dept"), var("d")),
        ]));
        let config = CompilerConfig {
            self_join_elimination: false,
            ..CompilerConfig::default()
        };
        let compiled = compile_with(query, &config).unwrap();
        assert_eq!(compiled.sql.matches("[employees]").count(), 2);
        assert!(compiled.sql.contains("INNER JOIN"));
    }

    #[test]
    fn test_optional_becomes_left_join() {
        let query = SparqlQuery::Pattern(GraphPattern::left_join(
            employees_named(),
            triple(var("s"), iri("dept"), var("d")),
        ));
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("LEFT JOIN"));
    }

    #[test]
    fn test_union_of_patterns() {
        let query = SparqlQuery::Pattern(GraphPattern::Union(vec![
            employees_named(),
            triple(var("s"), iri("label"), var("n")),
        ]));
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("UNION ALL"));
        assert!(compiled.sql.contains("[employees]"));
        assert!(compiled.sql.contains("[departments]"));
    }

    #[test]
    fn test_unknown_predicate_compiles_to_no_rows() {
        let query = SparqlQuery::Pattern(triple(var("s"), iri("salary"), var("x")));
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("1=0"));
    }

    #[test]
    fn test_postgres_paging() {
        let query = SparqlQuery::slice(
            SparqlQuery::order_by(
                SparqlQuery::Pattern(employees_named()),
                vec![OrderCondition::asc(SparqlExpression::variable("n"))],
            ),
            Some(10),
            Some(5),
        );
        let config = CompilerConfig {
            dialect: DialectKind::PostgreSql,
            ..CompilerConfig::default()
        };
        let compiled = compile_with(query, &config).unwrap();
        assert!(compiled.sql.contains("ORDER BY"));
        assert!(compiled.sql.ends_with("LIMIT 5 OFFSET 10"));
    }

    #[test]
    fn test_mssql_zero_limit_with_offset_selects_nothing() {
        let query = SparqlQuery::slice(
            SparqlQuery::order_by(
                SparqlQuery::Pattern(employees_named()),
                vec![OrderCondition::asc(SparqlExpression::variable("n"))],
            ),
            Some(5),
            Some(0),
        );
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("TOP (0)"), "{}", compiled.sql);
        assert!(!compiled.sql.contains("FETCH NEXT"), "{}", compiled.sql);
    }

    #[test]
    fn test_regex_prefix_matches_case_sensitively() {
        let query = || {
            SparqlQuery::Pattern(GraphPattern::filter(
                employees_named(),
                SparqlExpression::Regex {
                    text: Box::new(SparqlExpression::variable("n")),
                    pattern: "^Ann".into(),
                    flags: None,
                },
            ))
        };
        let compiled = compile_default(query()).unwrap();
        assert!(
            compiled.sql.contains("COLLATE Latin1_General_CS_AS LIKE N'Ann%'"),
            "{}",
            compiled.sql
        );

        let config = CompilerConfig {
            dialect: DialectKind::PostgreSql,
            ..CompilerConfig::default()
        };
        let compiled = compile_with(query(), &config).unwrap();
        assert!(compiled.sql.contains("LIKE 'Ann%'"), "{}", compiled.sql);
        assert!(!compiled.sql.contains("COLLATE"), "{}", compiled.sql);
    }

    #[test]
    fn test_mssql_offset_requires_order() {
        let query = SparqlQuery::slice(SparqlQuery::Pattern(employees_named()), Some(10), None);
        let err = compile_default(query).unwrap_err();
        assert!(matches!(
            err,
            CompileError::SqlGeneration(SqlGeneratorError::Dialect(_))
        ));
    }

    #[test]
    fn test_minus_is_not_implemented() {
        let query = SparqlQuery::Pattern(GraphPattern::Minus {
            left: Box::new(employees_named()),
            right: Box::new(triple(var("s"), iri("dept"), var("d"))),
        });
        let err = compile_default(query).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Planner(QueryPlannerError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let config = CompilerConfig {
            max_optimizer_rounds: 0,
            ..CompilerConfig::default()
        };
        let err = compile_with(SparqlQuery::Pattern(employees_named()), &config).unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }
}
