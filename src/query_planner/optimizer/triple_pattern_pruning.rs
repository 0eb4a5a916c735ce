//! Triple pattern pruning.
//!
//! A restricted triple pattern can only produce solutions when every
//! constant node in it is a term its term map can generate, and every
//! variable used twice within it is bound by term maps that can agree.
//! Patterns that fail either test become `NotMatching`, and the empty
//! result is propagated upward through the algebra.

use crate::database::TableSchema;
use crate::mapping::{ObjectMap, TermMap, TermType};
use crate::query_planner::{
    optimizer::{
        errors::{OptimizerError, Pass},
        optimizer_pass::{OptimizerResult, SparqlOptimizerPass},
    },
    pattern::{compare, term_map_pattern, ColumnSlot, MatchResult, Pattern},
    query_ctx::QueryContext,
    transformed::Transformed,
};
use crate::rdf::{vocab, RdfNode};
use crate::sparql::{GraphPattern, PatternItem, RestrictedTriplePattern, TriplePosition};

/// Term map generating one position of a restricted triple, with the table
/// it reads.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PositionMap<'t> {
    pub term_map: &'t TermMap,
    pub table: Option<&'t TableSchema>,
}

impl<'t> PositionMap<'t> {
    pub fn resolve(
        triple: &'t RestrictedTriplePattern,
        position: TriplePosition,
        ctx: &QueryContext<'t>,
        pass: &Pass,
    ) -> OptimizerResult<Self> {
        let owner = ctx
            .triples_map(&triple.triples_map_id)
            .map_err(|source| OptimizerError::Mapping {
                pass: pass.clone(),
                source,
            })?;
        let (term_map, table) = match position {
            TriplePosition::Subject => (&triple.subject_map, &owner.table),
            TriplePosition::Predicate => (&triple.predicate_map, &owner.table),
            TriplePosition::Object => match &triple.object_map {
                ObjectMap::Term(term_map) => (term_map, &owner.table),
                ObjectMap::Ref(reference) => {
                    let parent = ctx
                        .triples_map(&reference.parent_triples_map)
                        .map_err(|source| OptimizerError::Mapping {
                            pass: pass.clone(),
                            source,
                        })?;
                    (&parent.subject_map, &parent.table)
                }
            },
        };
        Ok(PositionMap {
            term_map,
            table: ctx.schema.table(table),
        })
    }

    fn pattern(&self, pass: &Pass) -> OptimizerResult<Option<Pattern<ColumnSlot>>> {
        term_map_pattern(self.term_map, self.table).map_err(|source| OptimizerError::Mapping {
            pass: pass.clone(),
            source,
        })
    }

    /// Whether the term map can generate `node`.
    pub fn can_produce(&self, node: &RdfNode, pass: &Pass) -> OptimizerResult<bool> {
        Ok(match node {
            RdfNode::Iri { value } => {
                self.term_map.term_type() == TermType::Iri
                    && match self.pattern(pass)? {
                        Some(pattern) => may_match(&pattern, &Pattern::text(value.as_str())),
                        None => true,
                    }
            }
            RdfNode::BlankNode { .. } => self.term_map.term_type() == TermType::BlankNode,
            RdfNode::Literal { .. } => {
                self.term_map.term_type() == TermType::Literal && literal_can_produce(self.term_map, node)
            }
        })
    }

    /// Whether both term maps can generate a common term.
    pub fn compatible_with(&self, other: &PositionMap, pass: &Pass) -> OptimizerResult<bool> {
        let term_type = self.term_map.term_type();
        if term_type != other.term_map.term_type() {
            return Ok(false);
        }
        Ok(match term_type {
            TermType::Iri => match (self.pattern(pass)?, other.pattern(pass)?) {
                (Some(left), Some(right)) => may_match(&left, &right),
                _ => true,
            },
            TermType::Literal => literals_compatible(self.term_map, other.term_map),
            TermType::BlankNode => true,
        })
    }
}

fn may_match(left: &Pattern<ColumnSlot>, right: &Pattern<ColumnSlot>) -> bool {
    !matches!(compare(left, right), MatchResult::NeverMatch)
}

fn literal_can_produce(term_map: &TermMap, node: &RdfNode) -> bool {
    let RdfNode::Literal {
        datatype, language, ..
    } = node
    else {
        return false;
    };
    if let Some(constant) = term_map.as_constant() {
        return constant == node;
    }
    match (&term_map.language, &term_map.datatype) {
        (Some(expected), _) => language
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(expected)),
        (None, Some(expected)) => {
            language.is_none()
                && (datatype.as_deref() == Some(expected.as_str())
                    || (datatype.is_none() && expected == vocab::XSD_STRING))
        }
        // Natural mapping: the datatype follows the column's SQL type.
        (None, None) => true,
    }
}

fn literals_compatible(left: &TermMap, right: &TermMap) -> bool {
    match (left.as_constant(), right.as_constant()) {
        (Some(l), Some(r)) => l == r,
        (Some(node), None) => literal_can_produce(right, node),
        (None, Some(node)) => literal_can_produce(left, node),
        (None, None) => match (&left.language, &right.language) {
            (Some(l), Some(r)) => l.eq_ignore_ascii_case(r),
            (Some(_), None) => right.datatype.is_none(),
            (None, Some(_)) => left.datatype.is_none(),
            (None, None) => match (&left.datatype, &right.datatype) {
                (Some(l), Some(r)) => l == r,
                _ => true,
            },
        },
    }
}

pub struct TriplePatternPruning;

impl TriplePatternPruning {
    pub fn new() -> Self {
        TriplePatternPruning
    }

    fn can_match(&self, triple: &RestrictedTriplePattern, ctx: &QueryContext) -> OptimizerResult<bool> {
        let pass = self.pass();
        let items = [
            (&triple.subject, TriplePosition::Subject),
            (&triple.predicate, TriplePosition::Predicate),
            (&triple.object, TriplePosition::Object),
        ];
        for (item, position) in items {
            if let PatternItem::Node(node) = item {
                let map = PositionMap::resolve(triple, position, ctx, &pass)?;
                if !map.can_produce(node, &pass)? {
                    log::trace!(
                        "TriplePatternPruning: {} cannot be produced by {} ({:?})",
                        node,
                        triple.triples_map_id,
                        position
                    );
                    return Ok(false);
                }
            }
        }

        let variables = triple.variable_positions();
        for (i, (name, position)) in variables.iter().enumerate() {
            for (other_name, other_position) in &variables[i + 1..] {
                if name != other_name {
                    continue;
                }
                let left = PositionMap::resolve(triple, *position, ctx, &pass)?;
                let right = PositionMap::resolve(triple, *other_position, ctx, &pass)?;
                if !left.compatible_with(&right, &pass)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn prune(&self, pattern: GraphPattern, ctx: &QueryContext) -> OptimizerResult<GraphPattern> {
        Ok(match pattern {
            GraphPattern::Empty | GraphPattern::NotMatching | GraphPattern::Triple(_) => pattern,
            GraphPattern::RestrictedTriple(triple) => {
                if self.can_match(&triple, ctx)? {
                    GraphPattern::RestrictedTriple(triple)
                } else {
                    GraphPattern::NotMatching
                }
            }
            GraphPattern::Join(children) => {
                let children = children
                    .into_iter()
                    .map(|c| self.prune(c, ctx))
                    .collect::<OptimizerResult<Vec<_>>>()?;
                if children.contains(&GraphPattern::NotMatching) {
                    GraphPattern::NotMatching
                } else {
                    GraphPattern::Join(children)
                }
            }
            GraphPattern::Union(children) => {
                let mut kept = Vec::with_capacity(children.len());
                for child in children {
                    let child = self.prune(child, ctx)?;
                    if child != GraphPattern::NotMatching {
                        kept.push(child);
                    }
                }
                match kept.len() {
                    0 => GraphPattern::NotMatching,
                    1 => kept.remove(0),
                    _ => GraphPattern::Union(kept),
                }
            }
            GraphPattern::Filter { inner, expression } => match self.prune(*inner, ctx)? {
                GraphPattern::NotMatching => GraphPattern::NotMatching,
                inner => GraphPattern::filter(inner, expression),
            },
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => match self.prune(*inner, ctx)? {
                GraphPattern::NotMatching => GraphPattern::NotMatching,
                inner => GraphPattern::extend(inner, variable, expression),
            },
            GraphPattern::LeftJoin {
                left,
                right,
                condition,
            } => match (self.prune(*left, ctx)?, self.prune(*right, ctx)?) {
                (GraphPattern::NotMatching, _) => GraphPattern::NotMatching,
                (left, GraphPattern::NotMatching) => left,
                (left, right) => GraphPattern::LeftJoin {
                    left: Box::new(left),
                    right: Box::new(right),
                    condition,
                },
            },
            GraphPattern::Minus { left, right } => {
                match (self.prune(*left, ctx)?, self.prune(*right, ctx)?) {
                    (GraphPattern::NotMatching, _) => GraphPattern::NotMatching,
                    (left, GraphPattern::NotMatching) => left,
                    (left, right) => GraphPattern::Minus {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                }
            }
        })
    }
}

impl SparqlOptimizerPass for TriplePatternPruning {
    fn pass(&self) -> Pass {
        Pass::TriplePatternPruning
    }

    fn optimize(
        &self,
        pattern: GraphPattern,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<GraphPattern>> {
        let pruned = self.prune(pattern.clone(), ctx)?;
        Ok(Transformed::compare(pattern, pruned))
    }
}
