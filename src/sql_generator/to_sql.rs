//! Leaf emission: expressions and filter conditions.

use crate::database::{SqlDialect, SqlType};
use crate::query_planner::calculus::{Constant, Expression, FilterCondition, VariableId};

use super::errors::SqlGeneratorError;
use super::naming::{source_alias, Binding, ScopeStack};

/// State threaded through one rendering: the dialect, the optional schema
/// qualifier and the scopes of the models entered so far.
pub struct RenderContext<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub default_schema: Option<&'a str>,
    pub scopes: ScopeStack,
}

impl<'a> RenderContext<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, default_schema: Option<&'a str>) -> Self {
        Self {
            dialect,
            default_schema,
            scopes: ScopeStack::default(),
        }
    }

    pub fn quote(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    /// `<alias>.<column>` of a variable, or its assigned expression inline.
    pub fn variable_sql(&self, variable: VariableId) -> Result<String, SqlGeneratorError> {
        match self.scopes.resolve(variable)? {
            Binding::Reference { source, column } => Ok(format!(
                "{}.{}",
                self.quote(&source_alias(source)),
                self.quote(&column)
            )),
            Binding::Assigned(expression) => expression.to_sql(self),
        }
    }

    /// Renders `expression` as a value of `target`, casting when the types
    /// differ.
    pub fn render_as(
        &self,
        expression: &Expression,
        target: SqlType,
    ) -> Result<String, SqlGeneratorError> {
        if expression.is_null() {
            return Ok(self.dialect.null_of_type(target));
        }
        let sql = expression.to_sql(self)?;
        if expression.sql_type() == target {
            Ok(sql)
        } else {
            Ok(self.dialect.cast(&sql, target))
        }
    }

    fn compare(
        &self,
        left: &Expression,
        operator: &str,
        right: &Expression,
    ) -> Result<String, SqlGeneratorError> {
        let promotion = self
            .dialect
            .common_type(left.sql_type(), right.sql_type());
        Ok(format!(
            "{} {} {}",
            self.render_as(left, promotion.common)?,
            operator,
            self.render_as(right, promotion.common)?
        ))
    }

    fn constant_sql(&self, constant: &Constant) -> String {
        match constant {
            Constant::String(s) => self.dialect.string_literal(s),
            Constant::Int(i) => self.dialect.int_literal(*i),
            Constant::Double(d) => self.dialect.double_literal(*d),
            Constant::Bool(b) => self.dialect.bool_literal(*b),
            Constant::DateTime(dt) => self.dialect.datetime_literal(dt),
        }
    }
}

/// Convert a calculus node to SQL text
pub trait ToSql {
    fn to_sql(&self, ctx: &RenderContext) -> Result<String, SqlGeneratorError>;
}

impl ToSql for Expression {
    fn to_sql(&self, ctx: &RenderContext) -> Result<String, SqlGeneratorError> {
        match self {
            // IRI escaping is applied when the term is materialized.
            Expression::Column { variable, .. } => ctx.variable_sql(variable.id),
            Expression::Constant(constant) => Ok(ctx.constant_sql(constant)),
            Expression::Concatenation(parts) => {
                let rendered = parts
                    .iter()
                    .map(|part| ctx.render_as(part, SqlType::String))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ctx.dialect.concat(&rendered))
            }
            Expression::Case { branches, sql_type } => {
                if branches.is_empty() {
                    return Ok(ctx.dialect.null_of_type(*sql_type));
                }
                let mut sql = String::from("CASE");
                for branch in branches {
                    sql.push_str(&format!(
                        " WHEN {} THEN {}",
                        branch.condition.to_sql(ctx)?,
                        ctx.render_as(&branch.value, *sql_type)?
                    ));
                }
                sql.push_str(" END");
                Ok(sql)
            }
            Expression::Coalesce(alternatives) => match alternatives.as_slice() {
                [] => Ok(ctx.dialect.null_of_type(SqlType::String)),
                [single] => single.to_sql(ctx),
                _ => {
                    let common = alternatives
                        .iter()
                        .skip(1)
                        .fold(alternatives[0].sql_type(), |acc, e| {
                            ctx.dialect.common_type(acc, e.sql_type()).common
                        });
                    let rendered = alternatives
                        .iter()
                        .map(|e| ctx.render_as(e, common))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(format!("COALESCE({})", rendered.join(", ")))
                }
            },
            Expression::Null(sql_type) => Ok(ctx.dialect.null_of_type(*sql_type)),
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let target = self.sql_type();
                Ok(format!(
                    "({} {} {})",
                    ctx.render_as(left, target)?,
                    operator.symbol(),
                    ctx.render_as(right, target)?
                ))
            }
        }
    }
}

fn join_conditions(
    conditions: &[FilterCondition],
    separator: &str,
    neutral: &str,
    ctx: &RenderContext,
) -> Result<String, SqlGeneratorError> {
    let rendered = conditions
        .iter()
        .map(|c| c.to_sql(ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match rendered.len() {
        0 => neutral.to_string(),
        1 => rendered.join(""),
        _ => format!("({})", rendered.join(separator)),
    })
}

impl ToSql for FilterCondition {
    fn to_sql(&self, ctx: &RenderContext) -> Result<String, SqlGeneratorError> {
        match self {
            FilterCondition::True => Ok("1=1".to_string()),
            FilterCondition::False => Ok("1=0".to_string()),
            FilterCondition::Conjunction(conditions) => {
                join_conditions(conditions, " AND ", "1=1", ctx)
            }
            FilterCondition::Disjunction(conditions) => {
                join_conditions(conditions, " OR ", "1=0", ctx)
            }
            FilterCondition::Negation(inner) => match inner.as_ref() {
                FilterCondition::IsNull(variable) => {
                    Ok(format!("{} IS NOT NULL", ctx.variable_sql(variable.id)?))
                }
                other => Ok(format!("NOT ({})", other.to_sql(ctx)?)),
            },
            FilterCondition::EqualExpressions(left, right) => ctx.compare(left, "=", right),
            FilterCondition::EqualVariables(left, right) => ctx.compare(
                &Expression::column(*left),
                "=",
                &Expression::column(*right),
            ),
            FilterCondition::IsNull(variable) => {
                Ok(format!("{} IS NULL", ctx.variable_sql(variable.id)?))
            }
            FilterCondition::Comparison {
                operator,
                left,
                right,
            } => ctx.compare(left, operator.symbol(), right),
            FilterCondition::Like {
                expression,
                pattern,
            } => Ok(ctx.dialect.like(
                &ctx.render_as(expression, SqlType::String)?,
                &ctx.dialect.string_literal(pattern),
            )),
        }
    }
}
