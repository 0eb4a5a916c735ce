//! Lowering of term maps, RDF nodes and SPARQL expressions into
//! [`ExpressionsSet`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::database::SqlType;
use crate::mapping::{TemplatePart, TermMapValue, TermType};
use crate::query_planner::calculus::{
    BinaryOperator, CaseBranch, Constant, Expression, ExpressionsSet, FilterCondition,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::{BaseValueBinder, ValueBinder};
use crate::rdf::{vocab, RdfNode};
use crate::sparql::{ArithmeticOperator, SparqlExpression};
use crate::types::{is_integer_datatype, payload_accepts, TypeCategory, ValueType};

use super::condition_builder::{
    category_is, create_is_bound_condition, lower_sparql_condition, not_null_condition,
};

/// Declared SQL type of each slot, in [`ExpressionsSet::expressions`] order.
pub(crate) const SLOT_TYPES: [SqlType; 6] = [
    SqlType::Int,
    SqlType::Int,
    SqlType::String,
    SqlType::Double,
    SqlType::Bool,
    SqlType::DateTime,
];

/// Lowers a term map evaluated over the columns of its source.
///
/// Constant maps lower like their RDF node. Column maps place the column in
/// the payload slot of the term's category; a column whose SQL type cannot
/// carry that category degrades to an opaque literal in the string slot.
/// Template maps always produce a string.
pub fn lower_term_map(
    binder: &BaseValueBinder,
    ctx: &QueryContext,
) -> Result<ExpressionsSet, QueryPlannerError> {
    let term_map = &binder.term_map;
    let column = |name: &str| {
        binder
            .variable_of(name)
            .ok_or_else(|| QueryPlannerError::UnresolvedColumn(name.to_string()))
    };

    match &term_map.value {
        TermMapValue::Constant(node) => lower_rdf_node(node, ctx),
        TermMapValue::Column(name) => {
            let variable = column(name)?;
            let mut value_type = ctx
                .type_cache
                .value_type_of_term_map(term_map, Some(variable.sql_type));
            if !payload_accepts(value_type.category(), variable.sql_type) {
                value_type = ValueType::OtherLiteral {
                    datatype: value_type
                        .datatype()
                        .unwrap_or(vocab::XSD_STRING)
                        .to_string(),
                };
            }
            let category = value_type.category();
            let value = match category {
                TypeCategory::Numeric | TypeCategory::Boolean | TypeCategory::DateTime => {
                    Expression::column(variable)
                }
                _ => Expression::concat(vec![Expression::column(variable)]),
            };
            Ok(ExpressionsSet::typed(
                ctx.type_cache.index_of(&value_type),
                category,
                value,
            ))
        }
        TermMapValue::Template(_) => {
            let parts = term_map.template_parts()?.unwrap_or_default();
            let iri_escaped = term_map.term_type() == TermType::Iri;
            let mut expressions = Vec::with_capacity(parts.len());
            for part in parts {
                expressions.push(match part {
                    TemplatePart::Text(text) => Expression::string(text),
                    TemplatePart::Column(name) => Expression::Column {
                        variable: column(&name)?,
                        iri_escaped,
                    },
                });
            }
            let value_type = ctx.type_cache.value_type_of_term_map(term_map, None);
            Ok(ExpressionsSet::typed(
                ctx.type_cache.index_of(&value_type),
                value_type.category(),
                Expression::concat(expressions),
            ))
        }
    }
}

fn parse_boolean(lexical: &str) -> Option<bool> {
    match lexical.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(lexical: &str) -> Option<NaiveDateTime> {
    let lexical = lexical.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(lexical) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(lexical, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Lowers a concrete RDF term to constants.
///
/// A typed literal whose lexical form is invalid for its datatype is kept as
/// an opaque literal of that datatype.
pub fn lower_rdf_node(
    node: &RdfNode,
    ctx: &QueryContext,
) -> Result<ExpressionsSet, QueryPlannerError> {
    let value_type = ctx.type_cache.value_type_of_node(node);
    let lexical = node.lexical_form();

    let value = match &value_type {
        ValueType::Numeric { datatype } => {
            if is_integer_datatype(datatype) {
                lexical.trim().parse::<i64>().ok().map(Constant::Int)
            } else {
                lexical.trim().parse::<f64>().ok().map(Constant::Double)
            }
        }
        ValueType::Boolean => parse_boolean(lexical).map(Constant::Bool),
        ValueType::DateTime { .. } => parse_datetime(lexical).map(Constant::DateTime),
        _ => Some(Constant::String(lexical.to_string())),
    };

    let (value_type, value) = match value {
        Some(value) => (value_type, value),
        None => {
            log::debug!("Literal {} is ill-typed, treating it as opaque", node);
            (
                ValueType::OtherLiteral {
                    datatype: value_type
                        .datatype()
                        .unwrap_or(vocab::XSD_STRING)
                        .to_string(),
                },
                Constant::String(lexical.to_string()),
            )
        }
    };

    Ok(ExpressionsSet::typed(
        ctx.type_cache.index_of(&value_type),
        value_type.category(),
        Expression::Constant(value),
    ))
}

/// Expressions set of whatever term a binder produces.
pub fn binder_expressions(
    binder: &ValueBinder,
    ctx: &QueryContext,
) -> Result<ExpressionsSet, QueryPlannerError> {
    match binder {
        ValueBinder::Base(base) => lower_term_map(base, ctx),
        ValueBinder::Empty { .. } => Ok(ExpressionsSet::null()),
        ValueBinder::ExpressionSet { expressions, .. } => Ok(expressions.clone()),
        ValueBinder::Coalesce { binders, .. } => {
            let mut guarded = Vec::with_capacity(binders.len());
            for binder in binders {
                guarded.push((
                    create_is_bound_condition(binder),
                    binder_expressions(binder, ctx)?,
                ));
            }
            Ok(guarded_sets(guarded))
        }
        ValueBinder::Switch {
            case_variable,
            cases,
            ..
        } => {
            let mut guarded = Vec::with_capacity(cases.len());
            for case in cases {
                guarded.push((
                    FilterCondition::equal(
                        Expression::column(*case_variable),
                        Expression::int(case.case_value),
                    ),
                    binder_expressions(&case.binder, ctx)?,
                ));
            }
            Ok(guarded_sets(guarded))
        }
    }
}

/// Slot-wise CASE over `(guard, set)` pairs: the first guard that holds
/// selects the set.
fn guarded_sets(guarded: Vec<(FilterCondition, ExpressionsSet)>) -> ExpressionsSet {
    let slot = |i: usize| {
        Expression::case(
            guarded
                .iter()
                .map(|(condition, set)| CaseBranch {
                    condition: condition.clone(),
                    value: set.expressions()[i].clone(),
                })
                .collect(),
            SLOT_TYPES[i],
        )
    };
    ExpressionsSet {
        type_id: slot(0),
        type_category: slot(1),
        string: slot(2),
        numeric: slot(3),
        boolean: slot(4),
        datetime: slot(5),
    }
}

pub(crate) fn find_binder<'b>(binders: &'b [ValueBinder], name: &str) -> Option<&'b ValueBinder> {
    binders.iter().find(|b| b.name() == name)
}

/// Lowers a SPARQL expression against the binders in scope. Unknown
/// variables are unbound.
pub fn lower_sparql_expression(
    expression: &SparqlExpression,
    binders: &[ValueBinder],
    ctx: &QueryContext,
) -> Result<ExpressionsSet, QueryPlannerError> {
    match expression {
        SparqlExpression::Variable(name) => match find_binder(binders, name) {
            Some(binder) => binder_expressions(binder, ctx),
            None => Ok(ExpressionsSet::null()),
        },
        SparqlExpression::Node(node) => lower_rdf_node(node, ctx),
        SparqlExpression::Arithmetic {
            operator,
            left,
            right,
        } => {
            let left = lower_sparql_expression(left, binders, ctx)?;
            let right = lower_sparql_expression(right, binders, ctx)?;
            let operator = match operator {
                ArithmeticOperator::Add => BinaryOperator::Add,
                ArithmeticOperator::Subtract => BinaryOperator::Subtract,
                ArithmeticOperator::Multiply => BinaryOperator::Multiply,
                ArithmeticOperator::Divide => BinaryOperator::Divide,
            };
            let value = Expression::binary(operator, left.numeric.clone(), right.numeric.clone());
            let datatype = if operator == BinaryOperator::Divide {
                vocab::XSD_DECIMAL
            } else if value.sql_type() == SqlType::Double {
                vocab::XSD_DOUBLE
            } else {
                vocab::XSD_INTEGER
            };
            let guard = FilterCondition::and(vec![
                category_is(&left, TypeCategory::Numeric),
                category_is(&right, TypeCategory::Numeric),
                not_null_condition(&value),
            ]);
            let result = ExpressionsSet::typed(
                ctx.type_cache.index_of(&ValueType::of_datatype(datatype)),
                TypeCategory::Numeric,
                value,
            );
            Ok(result.map(|e| guard_expression(&guard, e)))
        }
        SparqlExpression::And(..)
        | SparqlExpression::Or(..)
        | SparqlExpression::Not(_)
        | SparqlExpression::Comparison { .. }
        | SparqlExpression::Bound(_)
        | SparqlExpression::Regex { .. }
        | SparqlExpression::IsIri(_)
        | SparqlExpression::IsBlank(_)
        | SparqlExpression::IsLiteral(_) => {
            let part = lower_sparql_condition(expression, binders, ctx)?;
            let holds = FilterCondition::and(vec![part.is_not_error.clone(), part.main]);
            let boolean = Expression::case(
                vec![
                    CaseBranch {
                        condition: holds,
                        value: Expression::bool(true),
                    },
                    CaseBranch {
                        condition: part.is_not_error.clone(),
                        value: Expression::bool(false),
                    },
                ],
                SqlType::Bool,
            );
            let result = ExpressionsSet::typed(
                ctx.type_cache.index_of(&ValueType::Boolean),
                TypeCategory::Boolean,
                boolean,
            );
            let ne = part.is_not_error;
            Ok(ExpressionsSet {
                boolean: result.boolean.clone(),
                ..result.map(|e| guard_expression(&ne, e))
            })
        }
    }
}

/// `CASE WHEN guard THEN e END`, or `e` itself when it is NULL or the guard
/// always holds.
fn guard_expression(guard: &FilterCondition, expression: &Expression) -> Expression {
    if expression.is_null() {
        return expression.clone();
    }
    Expression::case(
        vec![CaseBranch {
            condition: guard.clone(),
            value: expression.clone(),
        }],
        expression.sql_type(),
    )
}

/// Whether the term described by `set` is bound.
pub fn expressions_set_bound(set: &ExpressionsSet) -> FilterCondition {
    not_null_condition(&set.type_category)
}
