//! Numeric column compared against a string constant.
//!
//! Term equality produces `numeric = 'text'` whenever a string payload from
//! one side meets a numeric column on the other. The constant is parsed as
//! the column's type; a constant that is not a number of that type can never
//! be equal.

use crate::database::SqlType;
use crate::query_planner::{
    calculus::{Constant, Expression, FilterCondition, RelationalQuery},
    optimizer::{
        errors::Pass,
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
        rewriter::rewrite_query,
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct NumericStringComparison;

enum Parsed {
    Number(Expression),
    NotANumber,
}

fn parse_as(text: &str, sql_type: SqlType) -> Option<Parsed> {
    let text = text.trim();
    match sql_type {
        SqlType::Int => Some(match text.parse::<i64>() {
            Ok(value) => Parsed::Number(Expression::int(value)),
            Err(_) => match text.parse::<f64>() {
                Ok(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                    Parsed::Number(Expression::int(value as i64))
                }
                _ => Parsed::NotANumber,
            },
        }),
        SqlType::Double => Some(match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Parsed::Number(Expression::double(value)),
            _ => Parsed::NotANumber,
        }),
        _ => None,
    }
}

impl NumericStringComparison {
    pub fn new() -> Self {
        NumericStringComparison
    }

    fn rewrite(condition: FilterCondition) -> FilterCondition {
        let FilterCondition::EqualExpressions(left, right) = &condition else {
            return condition;
        };
        let (column, text) = match (left, right) {
            (Expression::Constant(Constant::String(text)), other)
            | (other, Expression::Constant(Constant::String(text)))
                if other.as_constant().is_none() =>
            {
                (other, text)
            }
            _ => return condition,
        };
        match parse_as(text, column.sql_type()) {
            Some(Parsed::Number(number)) => FilterCondition::equal(column.clone(), number),
            Some(Parsed::NotANumber) => FilterCondition::False,
            None => condition,
        }
    }
}

impl RelationalOptimizerPass for NumericStringComparison {
    fn pass(&self) -> Pass {
        Pass::NumericStringComparison
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
