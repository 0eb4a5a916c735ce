//! Binds unrestricted triple patterns to the triples maps that can produce
//! them.
//!
//! Every `Triple` becomes a union of `RestrictedTriple` patterns, one per
//! (triples map, predicate-object map) pair plus one per `rr:class` of each
//! triples map. Pruning of impossible alternatives is left to the optimizer.

use crate::mapping::{MappingProvider, ObjectMap, TermMap};
use crate::rdf::{vocab, RdfNode};

use super::{GraphPattern, RestrictedTriplePattern, TriplePattern};

pub fn expand_triple_patterns(pattern: GraphPattern, mapping: &dyn MappingProvider) -> GraphPattern {
    match pattern {
        GraphPattern::Triple(triple) => expand_triple(&triple, mapping),
        GraphPattern::Empty | GraphPattern::NotMatching | GraphPattern::RestrictedTriple(_) => {
            pattern
        }
        GraphPattern::Filter { inner, expression } => GraphPattern::Filter {
            inner: Box::new(expand_triple_patterns(*inner, mapping)),
            expression,
        },
        GraphPattern::Join(children) => GraphPattern::Join(
            children
                .into_iter()
                .map(|c| expand_triple_patterns(c, mapping))
                .collect(),
        ),
        GraphPattern::Union(children) => GraphPattern::Union(
            children
                .into_iter()
                .map(|c| expand_triple_patterns(c, mapping))
                .collect(),
        ),
        GraphPattern::LeftJoin {
            left,
            right,
            condition,
        } => GraphPattern::LeftJoin {
            left: Box::new(expand_triple_patterns(*left, mapping)),
            right: Box::new(expand_triple_patterns(*right, mapping)),
            condition,
        },
        GraphPattern::Minus { left, right } => GraphPattern::Minus {
            left: Box::new(expand_triple_patterns(*left, mapping)),
            right: Box::new(expand_triple_patterns(*right, mapping)),
        },
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => GraphPattern::Extend {
            inner: Box::new(expand_triple_patterns(*inner, mapping)),
            variable,
            expression,
        },
    }
}

fn expand_triple(triple: &TriplePattern, mapping: &dyn MappingProvider) -> GraphPattern {
    let mut alternatives = Vec::new();

    for triples_map in mapping.triples_maps() {
        let restrict = |predicate_map: TermMap, object_map: ObjectMap| {
            GraphPattern::RestrictedTriple(Box::new(RestrictedTriplePattern {
                subject: triple.subject.clone(),
                predicate: triple.predicate.clone(),
                object: triple.object.clone(),
                triples_map_id: triples_map.id.clone(),
                subject_map: triples_map.subject_map.clone(),
                predicate_map,
                object_map,
            }))
        };

        for class in &triples_map.classes {
            alternatives.push(restrict(
                TermMap::constant_iri(vocab::RDF_TYPE),
                ObjectMap::Term(TermMap::constant(RdfNode::iri(class.clone()))),
            ));
        }
        for pom in &triples_map.predicate_object_maps {
            alternatives.push(restrict(pom.predicate_map.clone(), pom.object_map.clone()));
        }
    }

    log::debug!(
        "Expanded triple pattern into {} restricted alternative(s)",
        alternatives.len()
    );

    match alternatives.len() {
        0 => GraphPattern::NotMatching,
        1 => alternatives.remove(0),
        _ => GraphPattern::Union(alternatives),
    }
}
