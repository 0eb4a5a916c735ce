//! SPARQL algebra consumed by the compiler.
//!
//! The tree is produced by an external parser; it is loaded here from JSON
//! (see the binary) or built directly with the constructors below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::mapping::{ObjectMap, TermMap};
use crate::rdf::RdfNode;

pub mod expansion;

pub use expansion::expand_triple_patterns;

/// Subject, predicate or object of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternItem {
    Variable(String),
    Node(RdfNode),
}

impl PatternItem {
    pub fn variable(name: impl Into<String>) -> Self {
        PatternItem::Variable(name.into())
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            PatternItem::Variable(name) => Some(name),
            PatternItem::Node(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternItem,
    pub predicate: PatternItem,
    pub object: PatternItem,
}

impl TriplePattern {
    pub fn new(subject: PatternItem, predicate: PatternItem, object: PatternItem) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// A triple pattern bound to one predicate-object map of one triples map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedTriplePattern {
    pub subject: PatternItem,
    pub predicate: PatternItem,
    pub object: PatternItem,
    pub triples_map_id: String,
    pub subject_map: TermMap,
    pub predicate_map: TermMap,
    pub object_map: ObjectMap,
}

impl RestrictedTriplePattern {
    /// Variables together with the position they occupy.
    pub fn variable_positions(&self) -> Vec<(&str, TriplePosition)> {
        [
            (&self.subject, TriplePosition::Subject),
            (&self.predicate, TriplePosition::Predicate),
            (&self.object, TriplePosition::Object),
        ]
        .into_iter()
        .filter_map(|(item, position)| item.as_variable().map(|name| (name, position)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphPattern {
    /// The single empty solution.
    Empty,
    /// No solutions at all.
    NotMatching,
    Filter {
        inner: Box<GraphPattern>,
        expression: SparqlExpression,
    },
    Join(Vec<GraphPattern>),
    LeftJoin {
        left: Box<GraphPattern>,
        right: Box<GraphPattern>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<SparqlExpression>,
    },
    Minus {
        left: Box<GraphPattern>,
        right: Box<GraphPattern>,
    },
    Union(Vec<GraphPattern>),
    Triple(TriplePattern),
    RestrictedTriple(Box<RestrictedTriplePattern>),
    Extend {
        inner: Box<GraphPattern>,
        variable: String,
        expression: SparqlExpression,
    },
}

impl GraphPattern {
    pub fn triple(subject: PatternItem, predicate: PatternItem, object: PatternItem) -> Self {
        GraphPattern::Triple(TriplePattern::new(subject, predicate, object))
    }

    pub fn filter(inner: GraphPattern, expression: SparqlExpression) -> Self {
        GraphPattern::Filter {
            inner: Box::new(inner),
            expression,
        }
    }

    pub fn left_join(left: GraphPattern, right: GraphPattern) -> Self {
        GraphPattern::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            condition: None,
        }
    }

    pub fn extend(inner: GraphPattern, variable: impl Into<String>, expression: SparqlExpression) -> Self {
        GraphPattern::Extend {
            inner: Box::new(inner),
            variable: variable.into(),
            expression,
        }
    }

    /// Variables that may be bound by solutions of this pattern.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            GraphPattern::Empty | GraphPattern::NotMatching => {}
            GraphPattern::Filter { inner, .. } => inner.collect_variables(out),
            GraphPattern::Join(children) | GraphPattern::Union(children) => {
                for child in children {
                    child.collect_variables(out);
                }
            }
            GraphPattern::LeftJoin { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            GraphPattern::Minus { left, .. } => left.collect_variables(out),
            GraphPattern::Triple(triple) => {
                for item in [&triple.subject, &triple.predicate, &triple.object] {
                    if let Some(name) = item.as_variable() {
                        out.insert(name.to_string());
                    }
                }
            }
            GraphPattern::RestrictedTriple(triple) => {
                for (name, _) in triple.variable_positions() {
                    out.insert(name.to_string());
                }
            }
            GraphPattern::Extend {
                inner, variable, ..
            } => {
                inner.collect_variables(out);
                out.insert(variable.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparqlExpression {
    Variable(String),
    Node(RdfNode),
    And(Box<SparqlExpression>, Box<SparqlExpression>),
    Or(Box<SparqlExpression>, Box<SparqlExpression>),
    Not(Box<SparqlExpression>),
    Comparison {
        operator: ComparisonOperator,
        left: Box<SparqlExpression>,
        right: Box<SparqlExpression>,
    },
    Arithmetic {
        operator: ArithmeticOperator,
        left: Box<SparqlExpression>,
        right: Box<SparqlExpression>,
    },
    Bound(String),
    Regex {
        text: Box<SparqlExpression>,
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
    IsIri(Box<SparqlExpression>),
    IsBlank(Box<SparqlExpression>),
    IsLiteral(Box<SparqlExpression>),
}

impl SparqlExpression {
    pub fn variable(name: impl Into<String>) -> Self {
        SparqlExpression::Variable(name.into())
    }

    pub fn compare(operator: ComparisonOperator, left: SparqlExpression, right: SparqlExpression) -> Self {
        SparqlExpression::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: SparqlExpression, right: SparqlExpression) -> Self {
        Self::compare(ComparisonOperator::Equal, left, right)
    }

    pub fn and(left: SparqlExpression, right: SparqlExpression) -> Self {
        SparqlExpression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: SparqlExpression, right: SparqlExpression) -> Self {
        SparqlExpression::Or(Box::new(left), Box::new(right))
    }

    pub fn negate(inner: SparqlExpression) -> Self {
        SparqlExpression::Not(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCondition {
    pub expression: SparqlExpression,
    #[serde(default)]
    pub descending: bool,
}

impl OrderCondition {
    pub fn asc(expression: SparqlExpression) -> Self {
        Self {
            expression,
            descending: false,
        }
    }

    pub fn desc(expression: SparqlExpression) -> Self {
        Self {
            expression,
            descending: true,
        }
    }
}

/// Solution modifiers wrapped around a graph pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparqlQuery {
    Pattern(GraphPattern),
    Select {
        inner: Box<SparqlQuery>,
        variables: Vec<String>,
    },
    OrderBy {
        inner: Box<SparqlQuery>,
        conditions: Vec<OrderCondition>,
    },
    Slice {
        inner: Box<SparqlQuery>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Distinct {
        inner: Box<SparqlQuery>,
    },
}

impl SparqlQuery {
    pub fn select(inner: SparqlQuery, variables: &[&str]) -> Self {
        SparqlQuery::Select {
            inner: Box::new(inner),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn order_by(inner: SparqlQuery, conditions: Vec<OrderCondition>) -> Self {
        SparqlQuery::OrderBy {
            inner: Box::new(inner),
            conditions,
        }
    }

    pub fn slice(inner: SparqlQuery, offset: Option<usize>, limit: Option<usize>) -> Self {
        SparqlQuery::Slice {
            inner: Box::new(inner),
            offset,
            limit,
        }
    }

    pub fn distinct(inner: SparqlQuery) -> Self {
        SparqlQuery::Distinct {
            inner: Box::new(inner),
        }
    }

    /// Applies `f` to the graph pattern at the bottom of the modifier chain.
    pub fn try_map_pattern<E>(
        self,
        f: &mut impl FnMut(GraphPattern) -> Result<GraphPattern, E>,
    ) -> Result<SparqlQuery, E> {
        Ok(match self {
            SparqlQuery::Pattern(pattern) => SparqlQuery::Pattern(f(pattern)?),
            SparqlQuery::Select { inner, variables } => SparqlQuery::Select {
                inner: Box::new(inner.try_map_pattern(f)?),
                variables,
            },
            SparqlQuery::OrderBy { inner, conditions } => SparqlQuery::OrderBy {
                inner: Box::new(inner.try_map_pattern(f)?),
                conditions,
            },
            SparqlQuery::Slice {
                inner,
                offset,
                limit,
            } => SparqlQuery::Slice {
                inner: Box::new(inner.try_map_pattern(f)?),
                offset,
                limit,
            },
            SparqlQuery::Distinct { inner } => SparqlQuery::Distinct {
                inner: Box::new(inner.try_map_pattern(f)?),
            },
        })
    }
}
