//! Pattern matcher: can two patterns produce the same string?
//!
//! Both patterns are exploded into character tokens and slot tokens. Common
//! literal prefixes and suffixes are stripped character by character; a
//! mismatching character means the patterns never match.
//!
//! When every slot on both sides is IRI-escaped, slot values only contain
//! unreserved characters, so the reserved characters of the literal text
//! split both patterns into aligned segments. The reserved-character
//! skeletons must agree and every segment pair is matched on its own.

use std::collections::VecDeque;

use super::{is_unreserved, Pattern, PatternPart, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchCondition<S> {
    SlotEqualsSlot(S, S),
    SlotEqualsText(S, String),
    /// An irreducible region: the two sub-patterns must produce the same
    /// string.
    PatternsEqual(Pattern<S>, Pattern<S>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<S> {
    AlwaysMatch,
    NeverMatch,
    /// The patterns match exactly when all conditions hold.
    Conditions(Vec<MatchCondition<S>>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token<S> {
    Char(char),
    Slot(S),
}

fn tokens<S: Slot>(pattern: &Pattern<S>) -> Vec<Token<S>> {
    let mut tokens = Vec::new();
    for part in &pattern.parts {
        match part {
            PatternPart::Text(text) => tokens.extend(text.chars().map(Token::Char)),
            PatternPart::Slot(slot) => tokens.push(Token::Slot(slot.clone())),
        }
    }
    tokens
}

fn to_pattern<S: Slot>(tokens: Vec<Token<S>>, iri_escaped: bool) -> Pattern<S> {
    let mut parts = Vec::new();
    for token in tokens {
        match token {
            Token::Char(c) => parts.push(PatternPart::Text(c.to_string())),
            Token::Slot(slot) => parts.push(PatternPart::Slot(slot)),
        }
    }
    Pattern::new(parts, iri_escaped)
}

fn escaped<S: Slot>(pattern: &Pattern<S>) -> bool {
    pattern.iri_escaped || !pattern.has_slots()
}

/// Splits at reserved characters, returning the segments and the reserved
/// characters between them.
fn segments<S: Slot>(tokens: Vec<Token<S>>) -> (Vec<Vec<Token<S>>>, Vec<char>) {
    let mut segments = Vec::new();
    let mut skeleton = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        match token {
            Token::Char(c) if !is_unreserved(c) => {
                skeleton.push(c);
                segments.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    segments.push(current);
    (segments, skeleton)
}

/// Compares two patterns.
pub fn compare<S: Slot>(left: &Pattern<S>, right: &Pattern<S>) -> MatchResult<S> {
    let iri_escaped = escaped(left) && escaped(right);
    let regions: Vec<(Vec<Token<S>>, Vec<Token<S>>)> = if iri_escaped {
        let (left_segments, left_skeleton) = segments(tokens(left));
        let (right_segments, right_skeleton) = segments(tokens(right));
        if left_skeleton != right_skeleton {
            return MatchResult::NeverMatch;
        }
        left_segments.into_iter().zip(right_segments).collect()
    } else {
        vec![(tokens(left), tokens(right))]
    };

    let mut conditions = Vec::new();
    for (left_region, right_region) in regions {
        match compare_region(left_region, right_region, left.iri_escaped, right.iri_escaped) {
            MatchResult::NeverMatch => return MatchResult::NeverMatch,
            MatchResult::AlwaysMatch => {}
            MatchResult::Conditions(region_conditions) => conditions.extend(region_conditions),
        }
    }

    if conditions.is_empty() {
        MatchResult::AlwaysMatch
    } else {
        MatchResult::Conditions(conditions)
    }
}

fn front_char<S>(tokens: &VecDeque<Token<S>>) -> Option<char> {
    match tokens.front() {
        Some(Token::Char(c)) => Some(*c),
        _ => None,
    }
}

fn back_char<S>(tokens: &VecDeque<Token<S>>) -> Option<char> {
    match tokens.back() {
        Some(Token::Char(c)) => Some(*c),
        _ => None,
    }
}

fn single_slot<S>(tokens: &[Token<S>]) -> Option<&S> {
    match tokens {
        [Token::Slot(slot)] => Some(slot),
        _ => None,
    }
}

fn text_of<S>(tokens: &[Token<S>]) -> Option<String> {
    tokens
        .iter()
        .map(|t| match t {
            Token::Char(c) => Some(*c),
            Token::Slot(_) => None,
        })
        .collect()
}

/// Every slot of a text-free region must produce the empty string.
fn empty_region<S: Slot>(tokens: Vec<Token<S>>) -> MatchResult<S> {
    let mut conditions = Vec::new();
    for token in tokens {
        match token {
            Token::Char(_) => return MatchResult::NeverMatch,
            Token::Slot(slot) if !slot.can_be_empty() => return MatchResult::NeverMatch,
            Token::Slot(slot) => conditions.push(MatchCondition::SlotEqualsText(slot, String::new())),
        }
    }
    MatchResult::Conditions(conditions)
}

fn slot_equals_text<S: Slot>(slot: &S, text: String) -> MatchResult<S> {
    if text.is_empty() && !slot.can_be_empty() {
        return MatchResult::NeverMatch;
    }
    MatchResult::Conditions(vec![MatchCondition::SlotEqualsText(slot.clone(), text)])
}

fn compare_region<S: Slot>(
    left: Vec<Token<S>>,
    right: Vec<Token<S>>,
    left_escaped: bool,
    right_escaped: bool,
) -> MatchResult<S> {
    let mut left: VecDeque<Token<S>> = left.into();
    let mut right: VecDeque<Token<S>> = right.into();

    while let (Some(a), Some(b)) = (front_char(&left), front_char(&right)) {
        if a != b {
            return MatchResult::NeverMatch;
        }
        left.pop_front();
        right.pop_front();
    }
    while let (Some(a), Some(b)) = (back_char(&left), back_char(&right)) {
        if a != b {
            return MatchResult::NeverMatch;
        }
        left.pop_back();
        right.pop_back();
    }

    let left: Vec<Token<S>> = left.into();
    let right: Vec<Token<S>> = right.into();
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return MatchResult::AlwaysMatch,
        (true, false) => return empty_region(right),
        (false, true) => return empty_region(left),
        (false, false) => {}
    }

    match (single_slot(&left), single_slot(&right)) {
        (Some(a), Some(b)) => {
            MatchResult::Conditions(vec![MatchCondition::SlotEqualsSlot(a.clone(), b.clone())])
        }
        (Some(slot), None) => match text_of(&right) {
            Some(text) => slot_equals_text(slot, text),
            None => patterns_equal(left, right, left_escaped, right_escaped),
        },
        (None, Some(slot)) => match text_of(&left) {
            Some(text) => slot_equals_text(slot, text),
            None => patterns_equal(left, right, left_escaped, right_escaped),
        },
        (None, None) => patterns_equal(left, right, left_escaped, right_escaped),
    }
}

fn patterns_equal<S: Slot>(
    left: Vec<Token<S>>,
    right: Vec<Token<S>>,
    left_escaped: bool,
    right_escaped: bool,
) -> MatchResult<S> {
    MatchResult::Conditions(vec![MatchCondition::PatternsEqual(
        to_pattern(left, left_escaped),
        to_pattern(right, right_escaped),
    )])
}
