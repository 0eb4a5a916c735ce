//! Text patterns: sequences of literal text and opaque slots.
//!
//! Patterns describe the strings a URI template or a SQL concatenation can
//! produce. The matcher in [`matcher`] decides whether two patterns can
//! produce the same string and, when it depends on slot values, under which
//! conditions.

use std::fmt;

use crate::database::{SqlType, TableSchema};
use crate::mapping::{MappingError, TemplatePart, TermMap, TermMapValue, TermType};
use crate::query_planner::calculus::{Constant, Expression};

pub mod matcher;

pub use matcher::{compare, MatchCondition, MatchResult};

/// Payload of a pattern slot.
pub trait Slot: Clone + PartialEq + fmt::Debug {
    /// Whether the slot can produce the empty string.
    fn can_be_empty(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternPart<S> {
    Text(String),
    Slot(S),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern<S> {
    pub parts: Vec<PatternPart<S>>,
    /// Slot values are percent-encoded: they never contain characters
    /// outside the IRI-unreserved set.
    pub iri_escaped: bool,
}

impl<S: Slot> Pattern<S> {
    /// Builds a pattern, merging adjacent text and dropping empty text.
    pub fn new(parts: Vec<PatternPart<S>>, iri_escaped: bool) -> Self {
        let mut merged: Vec<PatternPart<S>> = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                PatternPart::Text(text) if text.is_empty() => {}
                PatternPart::Text(text) => match merged.last_mut() {
                    Some(PatternPart::Text(prev)) => prev.push_str(&text),
                    _ => merged.push(PatternPart::Text(text)),
                },
                slot => merged.push(slot),
            }
        }
        Self {
            parts: merged,
            iri_escaped,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![PatternPart::Text(text.into())], true)
    }

    pub fn has_slots(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, PatternPart::Slot(_)))
    }

    /// The literal string, when the pattern has no slots.
    pub fn as_text(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Text(text) => out.push_str(text),
                PatternPart::Slot(_) => return None,
            }
        }
        Some(out)
    }
}

/// IRI-unreserved characters (RFC 3987 `iunreserved`) plus `%`, the only
/// characters an escaped slot can produce. Non-ASCII `ucschar` values are
/// left unescaped by IRI-safe encoding.
pub fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '%') || is_ucschar(c)
}

fn is_ucschar(c: char) -> bool {
    let code = c as u32;
    // Supplementary planes exclude their last two code points.
    matches!(
        code,
        0xA0..=0xD7FF | 0xF900..=0xFDCF | 0xFDF0..=0xFFEF | 0x10000..=0xDFFFD | 0xE1000..=0xEFFFD
    ) && (code & 0xFFFF) <= 0xFFFD
}

/// Slot of a term-map template: one column of the triples map's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSlot {
    pub column: String,
    pub can_be_empty: bool,
}

impl Slot for ColumnSlot {
    fn can_be_empty(&self) -> bool {
        self.can_be_empty
    }
}

impl Slot for Expression {
    fn can_be_empty(&self) -> bool {
        match self {
            Expression::Constant(Constant::String(s)) => s.is_empty(),
            Expression::Constant(_) => false,
            _ => self.sql_type() == SqlType::String,
        }
    }
}

/// Pattern of the lexical forms a term map produces, or `None` when the
/// term map's term type cannot be compared lexically (blank nodes).
///
/// Columns of `table` that are not string-typed can never be empty.
pub fn term_map_pattern(
    term_map: &TermMap,
    table: Option<&TableSchema>,
) -> Result<Option<Pattern<ColumnSlot>>, MappingError> {
    if term_map.term_type() == TermType::BlankNode {
        return Ok(None);
    }
    let slot = |column: &str| ColumnSlot {
        column: column.to_string(),
        can_be_empty: table
            .and_then(|t| t.column(column))
            .map(|c| c.sql_type == SqlType::String)
            .unwrap_or(true),
    };
    let pattern = match &term_map.value {
        TermMapValue::Constant(node) => Pattern::text(node.lexical_form()),
        TermMapValue::Column(column) => Pattern::new(vec![PatternPart::Slot(slot(column))], false),
        TermMapValue::Template(_) => {
            let parts = term_map.template_parts()?.unwrap_or_default();
            Pattern::new(
                parts
                    .into_iter()
                    .map(|part| match part {
                        TemplatePart::Text(text) => PatternPart::Text(text),
                        TemplatePart::Column(column) => PatternPart::Slot(slot(&column)),
                    })
                    .collect(),
                term_map.is_iri(),
            )
        }
    };
    Ok(Some(pattern))
}
