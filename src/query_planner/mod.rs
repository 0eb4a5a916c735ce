//! SPARQL to relational query planning.
//!
//! Planning runs in three stages:
//! 1. unrestricted triple patterns are expanded against the mapping,
//! 2. the SPARQL-level pruning passes drop alternatives that cannot match,
//! 3. the algebra is lowered bottom-up into a [`calculus::RelationalQuery`],
//!    with the relational optimizer applied after every lowered node.

use errors::QueryPlannerError;

use crate::sparql::{expand_triple_patterns, SparqlQuery};

pub mod calculus;
pub mod errors;
pub mod lowering;
pub mod optimizer;
pub mod pattern;
pub mod query_ctx;
pub mod relational_builder;
pub mod transformed;
pub mod value_binder;

use calculus::RelationalQuery;
use query_ctx::QueryContext;

pub fn plan_query(
    query: SparqlQuery,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let mapping = ctx.mapping;
    let prepared = {
        let ctx: &QueryContext = ctx;
        query.try_map_pattern(&mut |pattern| {
            let expanded = expand_triple_patterns(pattern, mapping);
            optimizer::optimize_sparql(expanded, ctx)
        })?
    };
    log::debug!("Planning query: {:?}", prepared);

    let planned = relational_builder::build_relational_query(&prepared, ctx)?;
    log::debug!(
        "Planned query with {} binder(s) over {} calculus variable(s)",
        planned.binders.len(),
        ctx.variable_count()
    );
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::database::{ColumnSchema, InMemorySchema, SqlType, TableSchema};
    use crate::mapping::{ObjectMap, R2rmlMapping, TermMap, TriplesMap};
    use crate::query_planner::calculus::{FilterCondition, SourceCondition};
    use crate::rdf::{vocab, RdfNode};
    use crate::sparql::{GraphPattern, PatternItem};
    use crate::types::TypeCache;

    fn mapping() -> R2rmlMapping {
        R2rmlMapping::new(vec![TriplesMap::new(
            "Item",
            "items",
            TermMap::template("http://ex.org/item/{id}"),
        )
        .with_class("http://ex.org/Item")
        .with_predicate_object(
            TermMap::constant_iri("http://ex.org/name"),
            ObjectMap::Term(TermMap::literal_column("name")),
        )])
        .unwrap()
    }

    fn schema() -> InMemorySchema {
        InMemorySchema::new(vec![TableSchema::new(
            "items",
            vec![
                ColumnSchema::new("id", SqlType::Int, true),
                ColumnSchema::new("name", SqlType::String, true),
            ],
        )
        .with_primary_key(&["id"])])
        .unwrap()
    }

    #[test]
    fn test_class_pattern_plans_single_table_with_one_filter() {
        let mapping = mapping();
        let schema = schema();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);

        let query = SparqlQuery::Pattern(GraphPattern::triple(
            PatternItem::variable("s"),
            PatternItem::Node(RdfNode::iri(vocab::RDF_TYPE)),
            PatternItem::Node(RdfNode::iri("http://ex.org/Item")),
        ));
        let planned = plan_query(query, &mut ctx).unwrap();
        let model = planned.model.model();
        assert_eq!(model.sources.len(), 1);
        assert!(matches!(&model.sources[0], SourceCondition::Table(t) if t.table == "items"));
        assert_eq!(model.filters.len(), 1);
        assert!(matches!(
            &model.filters[0],
            FilterCondition::Negation(inner) if matches!(**inner, FilterCondition::IsNull(_))
        ));
    }

    #[test]
    fn test_pruning_can_be_disabled() {
        let mapping = mapping();
        let schema = schema();
        let cache = TypeCache::new();
        let config = CompilerConfig {
            sparql_pruning: false,
            ..CompilerConfig::default()
        };
        let mut ctx = QueryContext::new(&mapping, &schema, &cache, &config);

        let query = SparqlQuery::Pattern(GraphPattern::triple(
            PatternItem::variable("s"),
            PatternItem::Node(RdfNode::iri(vocab::RDF_TYPE)),
            PatternItem::Node(RdfNode::iri("http://ex.org/Item")),
        ));
        let planned = plan_query(query, &mut ctx).unwrap();
        assert!(matches!(
            &planned.model.model().sources[0],
            SourceCondition::Union { .. }
        ));
    }
}
