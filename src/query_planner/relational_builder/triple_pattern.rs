//! Lowering of a triple pattern restricted to one predicate-object map.
//!
//! The triples map's table becomes a table source. Each position gets a
//! base value binder over the table's columns: variable positions add an
//! is-bound filter (or an equality filter when the variable repeats), and
//! constant positions add an equality filter against the lowered node.
//! Referencing object maps add the parent table as a second source joined
//! on the declared join conditions; without join conditions the parent
//! subject map is evaluated over the child's own row.

use crate::mapping::{MappingError, ObjectMap, TermMap, TriplesMap};
use crate::query_planner::calculus::{
    CalculusModel, FilterCondition, QueryModel, RelationalQuery, SourceCondition, TableColumn,
    TableSource,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::lowering::{
    create_equals_condition, create_is_bound_condition, lower_rdf_node,
};
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::{BaseValueBinder, ValueBinder};
use crate::sparql::{PatternItem, RestrictedTriplePattern};

/// A table source pulling every column of the triples map's table.
fn table_source(
    triples_map: &TriplesMap,
    ctx: &mut QueryContext,
) -> Result<TableSource, QueryPlannerError> {
    let table = ctx.table(&triples_map.table)?;
    let id = ctx.new_source_id();
    let columns = table
        .columns
        .iter()
        .map(|column| TableColumn {
            name: column.name.clone(),
            variable: ctx.new_variable(column.sql_type),
        })
        .collect();
    Ok(TableSource {
        id,
        table: triples_map.table.clone(),
        columns,
    })
}

fn column_of(
    triples_map: &TriplesMap,
    source: &TableSource,
    column: &str,
) -> Result<TableColumn, MappingError> {
    source
        .variable_of(column)
        .map(|variable| TableColumn {
            name: column.to_string(),
            variable,
        })
        .ok_or_else(|| MappingError::ColumnNotFound {
            triples_map: triples_map.id.clone(),
            table: source.table.clone(),
            column: column.to_string(),
        })
}

fn base_binder(
    name: &str,
    triples_map: &TriplesMap,
    term_map: &TermMap,
    source: &TableSource,
) -> Result<ValueBinder, QueryPlannerError> {
    let columns = term_map
        .referenced_columns()?
        .iter()
        .map(|column| column_of(triples_map, source, column))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValueBinder::Base(BaseValueBinder {
        name: name.to_string(),
        term_map: term_map.clone(),
        columns,
    }))
}

pub fn build_restricted_triple(
    triple: &RestrictedTriplePattern,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let triples_map = ctx.triples_map(&triple.triples_map_id)?;
    let source = table_source(triples_map, ctx)?;
    let mut sources = vec![SourceCondition::Table(source.clone())];
    let mut filters = Vec::new();

    let object_source = match &triple.object_map {
        ObjectMap::Term(term_map) => (triples_map, term_map, source.clone()),
        ObjectMap::Ref(reference) if reference.join_conditions.is_empty() => {
            // Same logical table: the parent subject map reads the child row.
            let parent = ctx.triples_map(&reference.parent_triples_map)?;
            (parent, &parent.subject_map, source.clone())
        }
        ObjectMap::Ref(reference) => {
            let parent = ctx.triples_map(&reference.parent_triples_map)?;
            let parent_source = table_source(parent, ctx)?;
            for join in &reference.join_conditions {
                let child = column_of(triples_map, &source, &join.child_column)?;
                let parent_column = column_of(parent, &parent_source, &join.parent_column)?;
                filters.push(FilterCondition::EqualVariables(
                    child.variable,
                    parent_column.variable,
                ));
            }
            sources.push(SourceCondition::Table(parent_source.clone()));
            (parent, &parent.subject_map, parent_source)
        }
    };

    let positions = [
        (&triple.subject, triples_map, &triple.subject_map, &source),
        (&triple.predicate, triples_map, &triple.predicate_map, &source),
        (&triple.object, object_source.0, object_source.1, &object_source.2),
    ];

    let mut binders: Vec<ValueBinder> = Vec::new();
    for (item, owner, term_map, position_source) in positions {
        match item {
            PatternItem::Node(node) => {
                let binder = base_binder("", owner, term_map, position_source)?;
                let constant = ValueBinder::ExpressionSet {
                    name: String::new(),
                    expressions: lower_rdf_node(node, ctx)?,
                };
                filters.push(create_equals_condition(&binder, &constant, ctx)?);
            }
            PatternItem::Variable(name) => {
                let binder = base_binder(name, owner, term_map, position_source)?;
                match binders.iter().find(|b| b.name() == name) {
                    Some(existing) => {
                        filters.push(create_is_bound_condition(&binder));
                        filters.push(create_equals_condition(existing, &binder, ctx)?);
                    }
                    None => {
                        filters.push(create_is_bound_condition(&binder));
                        binders.push(binder);
                    }
                }
            }
        }
    }

    log::debug!(
        "Lowered triple pattern over triples map `{}` into {} source(s) and {} filter(s)",
        triple.triples_map_id,
        sources.len(),
        filters.len()
    );

    Ok(RelationalQuery::new(
        QueryModel::Plain(CalculusModel::new(sources, filters, vec![])),
        binders,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::database::{ColumnSchema, InMemorySchema, SqlType, TableSchema};
    use crate::mapping::{MappingProvider, R2rmlMapping, RefObjectMap};
    use crate::query_planner::calculus::Expression;
    use crate::rdf::{vocab, RdfNode};
    use crate::types::TypeCache;

    fn fixtures() -> (R2rmlMapping, InMemorySchema) {
        let mapping = R2rmlMapping::new(vec![
            TriplesMap::new("Item", "items", TermMap::template("http://ex.org/item/{id}"))
                .with_class("http://ex.org/Item")
                .with_predicate_object(
                    TermMap::constant_iri("http://ex.org/owner"),
                    ObjectMap::Ref(RefObjectMap::new("Person", "owner_id", "id")),
                ),
            TriplesMap::new("Person", "people", TermMap::template("http://ex.org/person/{id}")),
        ])
        .unwrap();
        let schema = InMemorySchema::new(vec![
            TableSchema::new(
                "items",
                vec![
                    ColumnSchema::new("id", SqlType::Int, true),
                    ColumnSchema::new("owner_id", SqlType::Int, true),
                ],
            ),
            TableSchema::new("people", vec![ColumnSchema::new("id", SqlType::Int, true)]),
        ])
        .unwrap();
        (mapping, schema)
    }

    fn class_triple(mapping: &R2rmlMapping) -> RestrictedTriplePattern {
        let item = mapping.triples_map("Item").unwrap();
        RestrictedTriplePattern {
            subject: PatternItem::variable("s"),
            predicate: PatternItem::Node(RdfNode::iri(vocab::RDF_TYPE)),
            object: PatternItem::Node(RdfNode::iri("http://ex.org/Item")),
            triples_map_id: "Item".into(),
            subject_map: item.subject_map.clone(),
            predicate_map: TermMap::constant_iri(vocab::RDF_TYPE),
            object_map: ObjectMap::Term(TermMap::constant_iri("http://ex.org/Item")),
        }
    }

    #[test]
    fn test_class_triple_keeps_only_subject_bound_filter() {
        let (mapping, schema) = fixtures();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);

        let query = build_restricted_triple(&class_triple(&mapping), &mut ctx).unwrap();
        let model = query.model.model();
        assert_eq!(model.sources.len(), 1);
        assert_eq!(model.filters.len(), 1);
        assert!(matches!(
            &model.filters[0],
            FilterCondition::Negation(inner) if matches!(**inner, FilterCondition::IsNull(_))
        ));
        assert_eq!(query.binders.len(), 1);
        assert_eq!(query.binders[0].name(), "s");
    }

    #[test]
    fn test_ref_object_map_joins_parent_table() {
        let (mapping, schema) = fixtures();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        let item = mapping.triples_map("Item").unwrap();
        let pom = &item.predicate_object_maps[0];

        let triple = RestrictedTriplePattern {
            subject: PatternItem::variable("s"),
            predicate: PatternItem::Node(RdfNode::iri("http://ex.org/owner")),
            object: PatternItem::variable("o"),
            triples_map_id: "Item".into(),
            subject_map: item.subject_map.clone(),
            predicate_map: pom.predicate_map.clone(),
            object_map: pom.object_map.clone(),
        };
        let query = build_restricted_triple(&triple, &mut ctx).unwrap();
        let model = query.model.model();
        assert_eq!(model.sources.len(), 2);
        assert!(model
            .filters
            .iter()
            .any(|f| matches!(f, FilterCondition::EqualVariables(_, _))));

        match query.binder("o") {
            Some(ValueBinder::Base(base)) => {
                assert_eq!(base.term_map, TermMap::template("http://ex.org/person/{id}"));
                assert_eq!(base.columns.len(), 1);
            }
            other => panic!("unexpected binder {:?}", other),
        }
    }

    #[test]
    fn test_ref_object_map_without_join_conditions_reads_child_row() {
        let (mapping, schema) = fixtures();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        let item = mapping.triples_map("Item").unwrap();

        let triple = RestrictedTriplePattern {
            subject: PatternItem::variable("s"),
            predicate: PatternItem::Node(RdfNode::iri("http://ex.org/itself")),
            object: PatternItem::variable("o"),
            triples_map_id: "Item".into(),
            subject_map: item.subject_map.clone(),
            predicate_map: TermMap::constant_iri("http://ex.org/itself"),
            object_map: ObjectMap::Ref(RefObjectMap {
                parent_triples_map: "Item".into(),
                join_conditions: vec![],
            }),
        };
        let query = build_restricted_triple(&triple, &mut ctx).unwrap();
        let model = query.model.model();
        assert_eq!(model.sources.len(), 1);
        assert!(!model
            .filters
            .iter()
            .any(|f| matches!(f, FilterCondition::EqualVariables(_, _))));

        let subject = query.binder("s").unwrap().needed_variables();
        let object = query.binder("o").unwrap().needed_variables();
        assert_eq!(subject, object);
    }

    #[test]
    fn test_repeated_variable_adds_equality() {
        let (mapping, schema) = fixtures();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        let item = mapping.triples_map("Item").unwrap();

        let triple = RestrictedTriplePattern {
            subject: PatternItem::variable("x"),
            predicate: PatternItem::Node(RdfNode::iri("http://ex.org/self")),
            object: PatternItem::variable("x"),
            triples_map_id: "Item".into(),
            subject_map: item.subject_map.clone(),
            predicate_map: TermMap::constant_iri("http://ex.org/self"),
            object_map: ObjectMap::Term(TermMap::template("http://ex.org/item/{owner_id}")),
        };
        let query = build_restricted_triple(&triple, &mut ctx).unwrap();
        assert_eq!(query.binders.len(), 1);
        let filters = &query.model.model().filters;
        assert!(filters.iter().any(|f| matches!(
            f,
            FilterCondition::EqualExpressions(Expression::Concatenation(_), Expression::Concatenation(_))
                | FilterCondition::EqualVariables(_, _)
        )));
    }
}
