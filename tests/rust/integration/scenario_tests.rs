//! Optimizer behaviour observed through whole compilations.

#[cfg(test)]
mod scenario_tests {
    use r2sql::{
        config::{CompilerConfig, DialectKind},
        database::{InMemorySchema, MsSqlDialect, SqlType},
        mapping::{R2rmlMapping, TermMap},
        query_planner::{
            calculus::{CalculusVariable, FilterCondition, QueryModel, TableColumn, VariableId},
            lowering::create_join_equal_condition,
            optimizer::optimize_relational,
            plan_query,
            query_ctx::QueryContext,
            value_binder::{BaseValueBinder, ValueBinder},
        },
        rdf::RdfNode,
        sparql::{GraphPattern, PatternItem, SparqlExpression, SparqlQuery},
        sql_generator::{RenderContext, ToSql},
        types::TypeCache,
    };

    use super::super::fixtures::*;

    #[test]
    fn test_iri_constant_filter_compares_key_column() {
        let query = SparqlQuery::Pattern(GraphPattern::filter(
            triple(var("s"), iri("name"), var("n")),
            SparqlExpression::equal(
                SparqlExpression::variable("s"),
                SparqlExpression::Node(RdfNode::iri("http://ex.org/emp/7")),
            ),
        ));
        let compiled = compile_default(query).unwrap();
        assert!(
            !compiled.sql.contains("http://ex.org/emp/"),
            "template prefix should be stripped:\n{}",
            compiled.sql
        );
        assert!(compiled.sql.contains("[id]"));
    }

    #[test]
    fn test_iri_constant_outside_template_matches_nothing() {
        let query = SparqlQuery::Pattern(GraphPattern::filter(
            triple(var("s"), iri("name"), var("n")),
            SparqlExpression::equal(
                SparqlExpression::variable("s"),
                SparqlExpression::Node(RdfNode::iri("http://other.org/7")),
            ),
        ));
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("1=0"), "{}", compiled.sql);
    }

    #[test]
    fn test_non_ascii_iri_constant_matches_template() {
        let query = SparqlQuery::Pattern(triple(
            PatternItem::Node(RdfNode::iri("http://ex.org/city/Zürich")),
            iri("population"),
            var("p"),
        ));
        let compiled = compile_cities(query).unwrap();
        assert!(!compiled.sql.contains("1=0"), "{}", compiled.sql);
        assert!(compiled.sql.contains("[name] = N'Zürich'"), "{}", compiled.sql);
    }

    #[test]
    fn test_reference_without_join_conditions_stays_on_one_row() {
        let query = SparqlQuery::Pattern(triple(var("c"), iri("self"), var("o")));
        let compiled = compile_cities(query).unwrap();
        assert_eq!(compiled.sql.matches("[cities]").count(), 1, "{}", compiled.sql);
        assert!(!compiled.sql.contains("JOIN"), "{}", compiled.sql);
    }

    #[test]
    fn test_nested_slices_merge() {
        let inner = SparqlQuery::slice(
            SparqlQuery::Pattern(triple(var("s"), iri("name"), var("n"))),
            None,
            Some(20),
        );
        let query = SparqlQuery::slice(inner, Some(10), Some(5));
        let config = CompilerConfig {
            dialect: DialectKind::PostgreSql,
            ..CompilerConfig::default()
        };
        let compiled = compile_with(query, &config).unwrap();
        assert!(compiled.sql.ends_with("\nLIMIT 5 OFFSET 10"), "{}", compiled.sql);
        assert!(!compiled.sql.contains("LIMIT 20"));
    }

    #[test]
    fn test_join_equality_with_unbound_side_always_holds() {
        let mapping = R2rmlMapping::default();
        let schema = InMemorySchema::default();
        let type_cache = TypeCache::new();
        let config = CompilerConfig::default();
        let ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);

        let bound = ValueBinder::Base(BaseValueBinder {
            name: "x".into(),
            term_map: TermMap::template("http://ex.org/emp/{id}"),
            columns: vec![TableColumn {
                name: "id".into(),
                variable: CalculusVariable::new(VariableId(0), SqlType::Int),
            }],
        });
        for (left, right) in [
            (ValueBinder::empty("x"), bound.clone()),
            (bound.clone(), ValueBinder::empty("x")),
            (ValueBinder::empty("x"), ValueBinder::empty("x")),
        ] {
            let condition = create_join_equal_condition(&left, &right, &ctx).unwrap();
            assert_eq!(condition, FilterCondition::True);
            let render = RenderContext::new(&MsSqlDialect, None);
            assert_eq!(condition.to_sql(&render).unwrap(), "1=1");
        }
    }

    #[test]
    fn test_relational_optimizer_is_idempotent() {
        let mapping = R2rmlMapping::from_yaml_str(MAPPING_YAML).unwrap();
        let schema = InMemorySchema::from_yaml_str(SCHEMA_YAML).unwrap();
        let type_cache = TypeCache::new();
        let config = CompilerConfig {
            max_optimizer_rounds: 16,
            ..CompilerConfig::default()
        };

        let queries = vec![
            SparqlQuery::Pattern(GraphPattern::Join(vec![
                triple(var("s"), iri("name"), var("n")),
                triple(var("s"), iri("dept"), var("d")),
            ])),
            SparqlQuery::Pattern(GraphPattern::left_join(
                triple(var("s"), iri("name"), var("n")),
                triple(var("s"), iri("dept"), var("d")),
            )),
            SparqlQuery::Pattern(GraphPattern::Union(vec![
                triple(var("s"), iri("name"), var("n")),
                triple(var("s"), iri("label"), var("n")),
            ])),
        ];
        for query in queries {
            let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);
            let planned = plan_query(query, &mut ctx).unwrap();
            let again = optimize_relational(planned.clone(), &ctx).unwrap();
            assert_eq!(again, planned);
        }
    }

    #[test]
    fn test_join_through_reference_keeps_both_tables() {
        let query = SparqlQuery::Pattern(GraphPattern::Join(vec![
            triple(var("e"), iri("dept"), var("d")),
            triple(var("d"), iri("label"), var("l")),
        ]));
        let compiled = compile_default(query).unwrap();
        assert!(compiled.sql.contains("[employees]"));
        assert!(compiled.sql.contains("[departments]"));
        assert!(matches!(
            compiled.bindings.iter().find(|b| b.name() == "d").map(|b| &b.binder),
            Some(ValueBinder::Base(_)) | Some(ValueBinder::Coalesce { .. })
        ));
    }

    #[test]
    fn test_planned_model_is_plain_without_modifiers() {
        let mapping = R2rmlMapping::from_yaml_str(MAPPING_YAML).unwrap();
        let schema = InMemorySchema::from_yaml_str(SCHEMA_YAML).unwrap();
        let type_cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &type_cache, &config);
        let planned = plan_query(
            SparqlQuery::Pattern(triple(var("s"), iri("name"), var("n"))),
            &mut ctx,
        )
        .unwrap();
        assert!(matches!(planned.model, QueryModel::Plain(_)));
    }
}
