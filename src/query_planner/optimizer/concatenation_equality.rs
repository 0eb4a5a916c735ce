//! Equality between concatenations.
//!
//! Both sides of an equality are read as patterns (string constants are
//! text, every other part is a slot) and handed to the pattern matcher.
//! Common literal prefixes and suffixes disappear, and aligned slots become
//! plain column equalities, which the self-join and is-null passes can
//! reason about.
//!
//! Slots of IRI-escaped columns stand for the percent-encoded column value,
//! so a constant they are compared with is percent-decoded first.

use crate::query_planner::{
    calculus::{Constant, Expression, FilterCondition, RelationalQuery},
    optimizer::{
        errors::Pass,
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
        rewriter::rewrite_query,
    },
    pattern::{compare, MatchCondition, MatchResult, Pattern, PatternPart},
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct ConcatenationEquality;

fn pattern_of(expression: &Expression) -> Option<Pattern<Expression>> {
    let parts = match expression {
        Expression::Concatenation(parts) => parts.as_slice(),
        Expression::Column { .. } | Expression::Constant(Constant::String(_)) => {
            std::slice::from_ref(expression)
        }
        _ => return None,
    };
    let mut iri_escaped = true;
    let mut pattern = Vec::with_capacity(parts.len());
    for part in parts {
        pattern.push(match part {
            Expression::Constant(Constant::String(text)) => PatternPart::Text(text.clone()),
            Expression::Constant(Constant::Int(value)) => PatternPart::Text(value.to_string()),
            Expression::Column {
                iri_escaped: escaped,
                ..
            } => {
                iri_escaped &= *escaped;
                PatternPart::Slot(part.clone())
            }
            other => {
                iri_escaped = false;
                PatternPart::Slot(other.clone())
            }
        });
    }
    Some(Pattern::new(pattern, iri_escaped))
}

fn expression_of(pattern: Pattern<Expression>) -> Expression {
    Expression::concat(
        pattern
            .parts
            .into_iter()
            .map(|part| match part {
                PatternPart::Text(text) => Expression::string(text),
                PatternPart::Slot(slot) => slot,
            })
            .collect(),
    )
}

/// Decodes `%XX` escapes; `None` when an escape is malformed or the result
/// is not UTF-8.
pub(crate) fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let digits = bytes.get(i + 1..i + 3)?;
            out.extend(hex::decode(digits).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn condition_of(condition: MatchCondition<Expression>) -> FilterCondition {
    match condition {
        MatchCondition::SlotEqualsSlot(left, right) => {
            match (left.as_variable(), right.as_variable()) {
                (Some(l), Some(r)) if l.id == r.id => FilterCondition::is_not_null(l),
                (Some(l), Some(r)) => FilterCondition::EqualVariables(l, r),
                _ => FilterCondition::equal(left, right),
            }
        }
        MatchCondition::SlotEqualsText(slot, text) => match &slot {
            // The decoded text is a raw column value, not an IRI fragment.
            Expression::Column {
                variable,
                iri_escaped: true,
            } => match percent_decode(&text) {
                Some(decoded) => {
                    FilterCondition::equal(Expression::column(*variable), Expression::string(decoded))
                }
                None => FilterCondition::False,
            },
            _ => FilterCondition::equal(slot, Expression::string(text)),
        },
        MatchCondition::PatternsEqual(left, right) => {
            FilterCondition::equal(expression_of(left), expression_of(right))
        }
    }
}

impl ConcatenationEquality {
    pub fn new() -> Self {
        ConcatenationEquality
    }

    fn rewrite(condition: FilterCondition) -> FilterCondition {
        let FilterCondition::EqualExpressions(left, right) = &condition else {
            return condition;
        };
        if left.as_constant().is_some() && right.as_constant().is_some() {
            return condition;
        }
        let (Some(left_pattern), Some(right_pattern)) = (pattern_of(left), pattern_of(right))
        else {
            return condition;
        };

        match compare(&left_pattern, &right_pattern) {
            MatchResult::AlwaysMatch => FilterCondition::True,
            MatchResult::NeverMatch => FilterCondition::False,
            MatchResult::Conditions(conditions) => {
                if let [MatchCondition::PatternsEqual(l, r)] = conditions.as_slice() {
                    if *l == left_pattern && *r == right_pattern {
                        return condition;
                    }
                }
                let rewritten = FilterCondition::and(
                    conditions.into_iter().map(condition_of).collect::<Vec<_>>(),
                );
                log::trace!("ConcatenationEquality: {:?} => {:?}", condition, rewritten);
                rewritten
            }
        }
    }
}

impl RelationalOptimizerPass for ConcatenationEquality {
    fn pass(&self) -> Pass {
        Pass::ConcatenationEquality
    }

    fn optimize(
        &self,
        query: RelationalQuery,
        _ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>> {
        let rewritten = rewrite_query(query.clone(), &mut Self::rewrite);
        Ok(Transformed::compare(query, rewritten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlType;
    use crate::query_planner::calculus::{CalculusVariable, VariableId};

    fn var(id: usize, sql_type: SqlType) -> CalculusVariable {
        CalculusVariable::new(VariableId(id), sql_type)
    }

    #[test]
    fn test_common_prefix_is_stripped() {
        let x = var(0, SqlType::String);
        let y = var(1, SqlType::String);
        let condition = FilterCondition::equal(
            Expression::concat(vec![Expression::string("a/"), Expression::column(x)]),
            Expression::concat(vec![Expression::string("a/"), Expression::column(y)]),
        );
        assert_eq!(
            ConcatenationEquality::rewrite(condition),
            FilterCondition::EqualVariables(x, y)
        );
    }

    #[test]
    fn test_different_templates_never_match() {
        let id = var(0, SqlType::Int);
        let condition = FilterCondition::equal(
            Expression::concat(vec![
                Expression::string("http://ex.org/item/"),
                Expression::iri_column(id),
            ]),
            Expression::concat(vec![
                Expression::string("http://ex.org/person/"),
                Expression::iri_column(id),
            ]),
        );
        assert_eq!(
            ConcatenationEquality::rewrite(condition),
            FilterCondition::False
        );
    }

    #[test]
    fn test_escaped_column_against_iri_constant() {
        let name = var(0, SqlType::String);
        let template = Expression::concat(vec![
            Expression::string("http://ex.org/"),
            Expression::iri_column(name),
        ]);
        assert_eq!(
            ConcatenationEquality::rewrite(FilterCondition::equal(
                template.clone(),
                Expression::string("http://ex.org/a%20b")
            )),
            FilterCondition::equal(Expression::column(name), Expression::string("a b"))
        );
        assert_eq!(
            ConcatenationEquality::rewrite(FilterCondition::equal(
                template,
                Expression::string("http://ex.org/a%zz")
            )),
            FilterCondition::False
        );
    }

    #[test]
    fn test_irreducible_equality_is_unchanged() {
        let condition = FilterCondition::equal(
            Expression::concat(vec![
                Expression::column(var(0, SqlType::String)),
                Expression::column(var(1, SqlType::String)),
            ]),
            Expression::column(var(2, SqlType::String)),
        );
        assert_eq!(
            ConcatenationEquality::rewrite(condition.clone()),
            condition
        );
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%2Fb").as_deref(), Some("a/b"));
        assert_eq!(percent_decode("%E2%82%AC").as_deref(), Some("\u{20ac}"));
        assert_eq!(percent_decode("a%2"), None);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        use crate::config::CompilerConfig;
        use crate::database::InMemorySchema;
        use crate::mapping::R2rmlMapping;
        use crate::query_planner::calculus::{CalculusModel, QueryModel};
        use crate::query_planner::optimizer::assert_settles_in_one_run;
        use crate::types::TypeCache;

        let id = var(0, SqlType::String);
        let name = var(1, SqlType::String);
        let model = CalculusModel::new(
            vec![],
            vec![
                FilterCondition::equal(
                    Expression::concat(vec![
                        Expression::string("http://ex.org/item/"),
                        Expression::iri_column(id),
                    ]),
                    Expression::string("http://ex.org/item/a%20b"),
                ),
                FilterCondition::equal(
                    Expression::concat(vec![Expression::string("a/"), Expression::column(name)]),
                    Expression::concat(vec![
                        Expression::string("a/"),
                        Expression::column(var(2, SqlType::String)),
                    ]),
                ),
            ],
            vec![],
        );
        let mapping = R2rmlMapping::default();
        let schema = InMemorySchema::default();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        let rewritten = assert_settles_in_one_run(
            &ConcatenationEquality::new(),
            RelationalQuery::new(QueryModel::Plain(model), vec![]),
            &ctx,
        );
        let filters = &rewritten.model.model().filters;
        assert!(filters.contains(&FilterCondition::equal(
            Expression::column(id),
            Expression::string("a b")
        )));
        assert!(filters.contains(&FilterCondition::EqualVariables(name, var(2, SqlType::String))));
    }
}
