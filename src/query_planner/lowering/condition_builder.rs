//! Lowering of SPARQL filter expressions and binder relationships into
//! filter conditions.
//!
//! SPARQL comparisons are partial: only terms of the same category compare,
//! and comparing across categories is a type error that eliminates the
//! solution. Each comparison therefore becomes a disjunction over the
//! comparable categories, every branch guarded by category equality, paired
//! with an `is_not_error` condition that says when the comparison yields a
//! value at all.

use lazy_static::lazy_static;
use regex::Regex;

use crate::query_planner::calculus::{
    CaseBranch, Constant, Expression, ExpressionsSet, FilterCondition, RelationalOperator,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::ValueBinder;
use crate::sparql::{ComparisonOperator, SparqlExpression};
use crate::types::TypeCategory;

use super::expression_builder::{binder_expressions, find_binder, lower_rdf_node, lower_sparql_expression};

/// A lowered boolean SPARQL expression. The expression is true exactly when
/// both conditions hold, false when only `is_not_error` holds, and a type
/// error otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionPart {
    pub is_not_error: FilterCondition,
    pub main: FilterCondition,
}

impl ConditionPart {
    pub fn new(is_not_error: FilterCondition, main: FilterCondition) -> Self {
        Self { is_not_error, main }
    }

    /// Filter keeping the solutions for which the expression is true.
    pub fn into_filter(self) -> FilterCondition {
        FilterCondition::and(vec![self.is_not_error, self.main])
    }
}

lazy_static! {
    static ref LITERAL_REGEX: Regex =
        Regex::new(r"^(\^)?([^\\.+*?()|\[\]{}^$%_]*)(\$)?$").expect("valid literal-regex pattern");
}

/// `LIKE` pattern equivalent to a regex made of literal characters with
/// optional `^`/`$` anchors.
pub fn regex_to_like(pattern: &str) -> Option<String> {
    let captures = LITERAL_REGEX.captures(pattern)?;
    let body = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    let mut like = String::new();
    if captures.get(1).is_none() {
        like.push('%');
    }
    like.push_str(body);
    if captures.get(3).is_none() {
        like.push('%');
    }
    Some(like)
}

/// `set` belongs to `category`, folded when the category is static.
pub fn category_is(set: &ExpressionsSet, category: TypeCategory) -> FilterCondition {
    match &set.type_category {
        Expression::Constant(Constant::Int(code)) => FilterCondition::constant(*code == category.code()),
        Expression::Null(_) => FilterCondition::False,
        other => FilterCondition::equal(other.clone(), Expression::int(category.code())),
    }
}

/// SQL equality of two expressions, folded when both are constants or
/// either is NULL.
pub fn equal_expressions(left: &Expression, right: &Expression) -> FilterCondition {
    if left.is_null() || right.is_null() {
        return FilterCondition::False;
    }
    match (left.as_constant(), right.as_constant()) {
        (Some(l), Some(r)) => {
            FilterCondition::constant(l.compare(r) == Some(std::cmp::Ordering::Equal))
        }
        _ => FilterCondition::equal(left.clone(), right.clone()),
    }
}

/// Condition under which `expression` is not NULL.
pub fn not_null_condition(expression: &Expression) -> FilterCondition {
    match expression {
        Expression::Constant(_) => FilterCondition::True,
        Expression::Null(_) => FilterCondition::False,
        Expression::Column { variable, .. } => FilterCondition::is_not_null(*variable),
        Expression::Case { branches, .. } => {
            let mut alternatives = Vec::with_capacity(branches.len());
            let mut earlier_failed = Vec::new();
            for CaseBranch { condition, value } in branches {
                let mut conjuncts = earlier_failed.clone();
                conjuncts.push(condition.clone());
                conjuncts.push(not_null_condition(value));
                alternatives.push(FilterCondition::and(conjuncts));
                earlier_failed.push(FilterCondition::not(condition.clone()));
            }
            FilterCondition::or(alternatives)
        }
        Expression::Coalesce(alternatives) => {
            FilterCondition::or(alternatives.iter().map(not_null_condition))
        }
        Expression::Concatenation(parts) => FilterCondition::and(parts.iter().map(not_null_condition)),
        Expression::Binary { left, right, .. } => {
            FilterCondition::and(vec![not_null_condition(left), not_null_condition(right)])
        }
    }
}

fn case_is(binder_case: &Expression, value: i64) -> FilterCondition {
    FilterCondition::equal(binder_case.clone(), Expression::int(value))
}

/// Condition under which the binder produces a term.
pub fn create_is_bound_condition(binder: &ValueBinder) -> FilterCondition {
    match binder {
        ValueBinder::Base(base) => FilterCondition::and(
            base.columns
                .iter()
                .map(|c| FilterCondition::is_not_null(c.variable)),
        ),
        ValueBinder::Empty { .. } => FilterCondition::False,
        ValueBinder::Coalesce { binders, .. } => {
            FilterCondition::or(binders.iter().map(create_is_bound_condition))
        }
        ValueBinder::Switch {
            case_variable,
            cases,
            ..
        } => {
            let case_column = Expression::column(*case_variable);
            FilterCondition::or(cases.iter().map(|case| {
                FilterCondition::and(vec![
                    case_is(&case_column, case.case_value),
                    create_is_bound_condition(&case.binder),
                ])
            }))
        }
        ValueBinder::ExpressionSet { expressions, .. } => {
            not_null_condition(&expressions.type_category)
        }
    }
}

/// RDF term equality (`sameTerm`) of two expressions sets.
pub fn same_term(left: &ExpressionsSet, right: &ExpressionsSet) -> FilterCondition {
    FilterCondition::or(TypeCategory::ALL.iter().map(|&category| {
        FilterCondition::and(vec![
            category_is(left, category),
            category_is(right, category),
            equal_expressions(&left.type_id, &right.type_id),
            equal_expressions(left.payload(category), right.payload(category)),
        ])
    }))
}

/// SPARQL `=` of two expressions sets: numeric, boolean and datetime terms
/// compare by value across datatypes; language-tagged and other literals
/// also require the same type id.
pub fn value_equal(left: &ExpressionsSet, right: &ExpressionsSet) -> FilterCondition {
    FilterCondition::or(TypeCategory::ALL.iter().map(|&category| {
        FilterCondition::and(vec![
            comparable_in(left, right, category),
            equal_expressions(left.payload(category), right.payload(category)),
        ])
    }))
}

/// Both sets are of `category` and can be compared within it.
fn comparable_in(
    left: &ExpressionsSet,
    right: &ExpressionsSet,
    category: TypeCategory,
) -> FilterCondition {
    let mut conjuncts = vec![category_is(left, category), category_is(right, category)];
    if category.compares_within_type() {
        conjuncts.push(equal_expressions(&left.type_id, &right.type_id));
    }
    FilterCondition::and(conjuncts)
}

/// Condition under which two binders produce the same term.
///
/// Coalesce binders distribute over their alternatives, each guarded by the
/// earlier alternatives being unbound; switch binders distribute over their
/// cases guarded by the case value.
pub fn create_equals_condition(
    left: &ValueBinder,
    right: &ValueBinder,
    ctx: &QueryContext,
) -> Result<FilterCondition, QueryPlannerError> {
    match (left, right) {
        (ValueBinder::Empty { .. }, _) | (_, ValueBinder::Empty { .. }) => Ok(FilterCondition::False),
        (ValueBinder::Coalesce { binders, .. }, other)
        | (other, ValueBinder::Coalesce { binders, .. }) => {
            let mut alternatives = Vec::with_capacity(binders.len());
            let mut earlier_unbound = Vec::new();
            for binder in binders {
                let bound = create_is_bound_condition(binder);
                let mut conjuncts = earlier_unbound.clone();
                conjuncts.push(bound.clone());
                conjuncts.push(create_equals_condition(binder, other, ctx)?);
                alternatives.push(FilterCondition::and(conjuncts));
                earlier_unbound.push(FilterCondition::not(bound));
            }
            Ok(FilterCondition::or(alternatives))
        }
        (
            ValueBinder::Switch {
                case_variable,
                cases,
                ..
            },
            other,
        )
        | (
            other,
            ValueBinder::Switch {
                case_variable,
                cases,
                ..
            },
        ) => {
            let case_column = Expression::column(*case_variable);
            let mut alternatives = Vec::with_capacity(cases.len());
            for case in cases {
                alternatives.push(FilterCondition::and(vec![
                    case_is(&case_column, case.case_value),
                    create_equals_condition(&case.binder, other, ctx)?,
                ]));
            }
            Ok(FilterCondition::or(alternatives))
        }
        _ => Ok(same_term(
            &binder_expressions(left, ctx)?,
            &binder_expressions(right, ctx)?,
        )),
    }
}

/// Join compatibility of a shared variable: unbound on either side is
/// compatible with anything.
pub fn create_join_equal_condition(
    left: &ValueBinder,
    right: &ValueBinder,
    ctx: &QueryContext,
) -> Result<FilterCondition, QueryPlannerError> {
    Ok(FilterCondition::or(vec![
        FilterCondition::not(create_is_bound_condition(left)),
        FilterCondition::not(create_is_bound_condition(right)),
        create_equals_condition(left, right, ctx)?,
    ]))
}

fn operand(
    expression: &SparqlExpression,
    binders: &[ValueBinder],
    ctx: &QueryContext,
) -> Result<(ExpressionsSet, FilterCondition), QueryPlannerError> {
    let set = lower_sparql_expression(expression, binders, ctx)?;
    let bound = match expression {
        SparqlExpression::Variable(name) => find_binder(binders, name)
            .map(create_is_bound_condition)
            .unwrap_or(FilterCondition::False),
        _ => not_null_condition(&set.type_category),
    };
    Ok((set, bound))
}

fn relational_operator(operator: ComparisonOperator) -> Option<RelationalOperator> {
    match operator {
        ComparisonOperator::Less => Some(RelationalOperator::Less),
        ComparisonOperator::LessOrEqual => Some(RelationalOperator::LessOrEqual),
        ComparisonOperator::Greater => Some(RelationalOperator::Greater),
        ComparisonOperator::GreaterOrEqual => Some(RelationalOperator::GreaterOrEqual),
        ComparisonOperator::Equal | ComparisonOperator::NotEqual => None,
    }
}

/// Lowers a boolean SPARQL expression.
pub fn lower_sparql_condition(
    expression: &SparqlExpression,
    binders: &[ValueBinder],
    ctx: &QueryContext,
) -> Result<ConditionPart, QueryPlannerError> {
    match expression {
        SparqlExpression::Comparison {
            operator,
            left,
            right,
        } => {
            let (left, left_bound) = operand(left, binders, ctx)?;
            let (right, right_bound) = operand(right, binders, ctx)?;
            match relational_operator(*operator) {
                None => {
                    let equal = value_equal(&left, &right);
                    let main = if *operator == ComparisonOperator::NotEqual {
                        FilterCondition::not(equal)
                    } else {
                        equal
                    };
                    Ok(ConditionPart::new(
                        FilterCondition::and(vec![left_bound, right_bound]),
                        main,
                    ))
                }
                Some(relational) => {
                    let mut comparable = Vec::new();
                    let mut branches = Vec::new();
                    for category in TypeCategory::ORDERED {
                        let guard = comparable_in(&left, &right, category);
                        if guard == FilterCondition::False {
                            continue;
                        }
                        comparable.push(guard.clone());
                        branches.push(FilterCondition::and(vec![
                            guard,
                            FilterCondition::Comparison {
                                operator: relational,
                                left: left.payload(category).clone(),
                                right: right.payload(category).clone(),
                            },
                        ]));
                    }
                    Ok(ConditionPart::new(
                        FilterCondition::and(vec![
                            left_bound,
                            right_bound,
                            FilterCondition::or(comparable),
                        ]),
                        FilterCondition::or(branches),
                    ))
                }
            }
        }
        SparqlExpression::And(left, right) => {
            let l = lower_sparql_condition(left, binders, ctx)?;
            let r = lower_sparql_condition(right, binders, ctx)?;
            let is_not_error = FilterCondition::or(vec![
                FilterCondition::and(vec![l.is_not_error.clone(), r.is_not_error.clone()]),
                FilterCondition::and(vec![l.is_not_error.clone(), FilterCondition::not(l.main.clone())]),
                FilterCondition::and(vec![r.is_not_error.clone(), FilterCondition::not(r.main.clone())]),
            ]);
            let main = FilterCondition::and(vec![l.is_not_error, l.main, r.is_not_error, r.main]);
            Ok(ConditionPart::new(is_not_error, main))
        }
        SparqlExpression::Or(left, right) => {
            let l = lower_sparql_condition(left, binders, ctx)?;
            let r = lower_sparql_condition(right, binders, ctx)?;
            let l_true = FilterCondition::and(vec![l.is_not_error.clone(), l.main]);
            let r_true = FilterCondition::and(vec![r.is_not_error.clone(), r.main]);
            let is_not_error = FilterCondition::or(vec![
                FilterCondition::and(vec![l.is_not_error, r.is_not_error]),
                l_true.clone(),
                r_true.clone(),
            ]);
            Ok(ConditionPart::new(is_not_error, FilterCondition::or(vec![l_true, r_true])))
        }
        SparqlExpression::Not(inner) => {
            let inner = lower_sparql_condition(inner, binders, ctx)?;
            Ok(ConditionPart::new(inner.is_not_error, FilterCondition::not(inner.main)))
        }
        SparqlExpression::Bound(name) => Ok(ConditionPart::new(
            FilterCondition::True,
            find_binder(binders, name)
                .map(create_is_bound_condition)
                .unwrap_or(FilterCondition::False),
        )),
        SparqlExpression::IsIri(inner) => {
            let (set, bound) = operand(inner, binders, ctx)?;
            Ok(ConditionPart::new(bound, category_is(&set, TypeCategory::Iri)))
        }
        SparqlExpression::IsBlank(inner) => {
            let (set, bound) = operand(inner, binders, ctx)?;
            Ok(ConditionPart::new(bound, category_is(&set, TypeCategory::BlankNode)))
        }
        SparqlExpression::IsLiteral(inner) => {
            let (set, bound) = operand(inner, binders, ctx)?;
            let literal = FilterCondition::or(
                TypeCategory::ALL
                    .iter()
                    .filter(|c| c.is_literal())
                    .map(|&c| category_is(&set, c)),
            );
            Ok(ConditionPart::new(bound, literal))
        }
        SparqlExpression::Regex {
            text,
            pattern,
            flags,
        } => {
            if flags.as_deref().is_some_and(|f| !f.is_empty()) {
                return Err(QueryPlannerError::not_implemented(format!(
                    "regex flags `{}`",
                    flags.as_deref().unwrap_or_default()
                )));
            }
            let like = regex_to_like(pattern).ok_or_else(|| {
                QueryPlannerError::not_implemented(format!("regex pattern `{}`", pattern))
            })?;
            let (set, bound) = operand(text, binders, ctx)?;
            let is_string = FilterCondition::or(vec![
                category_is(&set, TypeCategory::SimpleLiteral),
                category_is(&set, TypeCategory::LangString),
            ]);
            Ok(ConditionPart::new(
                FilterCondition::and(vec![bound, is_string]),
                FilterCondition::Like {
                    expression: set.string.clone(),
                    pattern: like,
                },
            ))
        }
        SparqlExpression::Variable(_) => {
            let (set, bound) = operand(expression, binders, ctx)?;
            Ok(ConditionPart::new(
                FilterCondition::and(vec![bound, category_is(&set, TypeCategory::Boolean)]),
                equal_expressions(&set.boolean, &Expression::bool(true)),
            ))
        }
        SparqlExpression::Node(node) => {
            let set = lower_rdf_node(node, ctx)?;
            let value = match set.constant_category() {
                Some(TypeCategory::Boolean) => set.boolean.as_constant().cloned(),
                Some(TypeCategory::Numeric) => set.numeric.as_constant().cloned(),
                Some(TypeCategory::SimpleLiteral) => set.string.as_constant().cloned(),
                _ => None,
            };
            let truth = match value {
                Some(Constant::Bool(b)) => b,
                Some(Constant::Int(i)) => i != 0,
                Some(Constant::Double(d)) => d != 0.0 && !d.is_nan(),
                Some(Constant::String(s)) => !s.is_empty(),
                _ => {
                    return Err(QueryPlannerError::not_implemented(format!(
                        "effective boolean value of {}",
                        node
                    )))
                }
            };
            Ok(ConditionPart::new(FilterCondition::True, FilterCondition::constant(truth)))
        }
        SparqlExpression::Arithmetic { .. } => Err(QueryPlannerError::not_implemented(
            "effective boolean value of an arithmetic expression",
        )),
    }
}
