//! Is-null propagation.
//!
//! Walks every calculus model once, collecting which variables are known to
//! be NULL or known to be non-NULL, and folds `IS NULL` tests on them.
//!
//! Facts come from:
//! - columns declared non-nullable in the schema (own table sources only),
//! - left joins that can never match (all their variables are NULL),
//! - earlier top-level filters of the same model,
//! - earlier siblings inside a conjunction (assumed true) or a disjunction
//!   (assumed not true), and earlier branches of a CASE.
//!
//! SQL conditions are three-valued. Under an odd number of negations an
//! unknown condition is not interchangeable with a false one, so rewrites
//! that only hold up to that equivalence are applied in positive position
//! only.

use std::collections::HashMap;

use crate::query_planner::{
    calculus::{
        AssignmentCondition, CalculusModel, CaseBranch, Expression, FilterCondition,
        ModifiedCalculusModel, Ordering, QueryModel, RelationalQuery, SourceCondition, VariableId,
    },
    optimizer::{
        errors::{OptimizerError, Pass},
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct IsNullPropagation;

/// Truth value a condition is assumed to have.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Assumed {
    True,
    False,
    /// False or unknown.
    NotTrue,
}

/// Known nullness per variable: `true` means always NULL.
#[derive(Debug, Clone, Default)]
struct Facts {
    known: HashMap<VariableId, bool>,
}

impl Facts {
    fn get(&self, variable: VariableId) -> Option<bool> {
        self.known.get(&variable).copied()
    }

    fn set(&mut self, variable: VariableId, is_null: bool) {
        self.known.insert(variable, is_null);
    }

    fn learn_operand(&mut self, expression: &Expression) {
        if let Some(variable) = expression.as_variable() {
            self.set(variable.id, false);
        }
    }

    fn learn(&mut self, condition: &FilterCondition, assumed: Assumed) {
        match condition {
            FilterCondition::True | FilterCondition::False => {}
            FilterCondition::IsNull(variable) => self.set(variable.id, assumed == Assumed::True),
            FilterCondition::Negation(inner) => match assumed {
                Assumed::True => self.learn(inner, Assumed::False),
                Assumed::False => self.learn(inner, Assumed::True),
                Assumed::NotTrue if is_two_valued(inner) => self.learn(inner, Assumed::True),
                Assumed::NotTrue => {}
            },
            FilterCondition::Conjunction(children) => {
                if assumed == Assumed::True {
                    for child in children {
                        self.learn(child, Assumed::True);
                    }
                }
            }
            FilterCondition::Disjunction(children) => {
                if assumed != Assumed::True {
                    for child in children {
                        self.learn(child, assumed);
                    }
                }
            }
            FilterCondition::EqualVariables(left, right) => {
                if assumed != Assumed::NotTrue {
                    self.set(left.id, false);
                    self.set(right.id, false);
                }
            }
            FilterCondition::EqualExpressions(left, right)
            | FilterCondition::Comparison { left, right, .. } => {
                if assumed != Assumed::NotTrue {
                    self.learn_operand(left);
                    self.learn_operand(right);
                }
            }
            FilterCondition::Like { expression, .. } => {
                if assumed != Assumed::NotTrue {
                    self.learn_operand(expression);
                }
            }
        }
    }
}

/// Conditions that are never unknown.
fn is_two_valued(condition: &FilterCondition) -> bool {
    match condition {
        FilterCondition::True | FilterCondition::False | FilterCondition::IsNull(_) => true,
        FilterCondition::Negation(inner) => is_two_valued(inner),
        FilterCondition::Conjunction(children) | FilterCondition::Disjunction(children) => {
            children.iter().all(is_two_valued)
        }
        _ => false,
    }
}

fn simplify_condition(condition: &FilterCondition, facts: &Facts, positive: bool) -> FilterCondition {
    match condition {
        FilterCondition::True | FilterCondition::False => condition.clone(),
        FilterCondition::IsNull(variable) => match facts.get(variable.id) {
            Some(is_null) => FilterCondition::constant(is_null),
            None => condition.clone(),
        },
        FilterCondition::Conjunction(children) => {
            let mut local = facts.clone();
            let mut simplified = Vec::with_capacity(children.len());
            for child in children {
                let child = simplify_condition(child, &local, positive);
                if positive || is_two_valued(&child) {
                    local.learn(&child, Assumed::True);
                }
                simplified.push(child);
            }
            FilterCondition::and(simplified)
        }
        FilterCondition::Disjunction(children) => {
            let mut local = facts.clone();
            let mut simplified = Vec::with_capacity(children.len());
            for child in children {
                let child = simplify_condition(child, &local, positive);
                local.learn(&child, Assumed::NotTrue);
                simplified.push(child);
            }
            FilterCondition::or(simplified)
        }
        FilterCondition::Negation(inner) => {
            FilterCondition::not(simplify_condition(inner, facts, !positive))
        }
        FilterCondition::EqualVariables(left, right) => {
            let null_operand =
                facts.get(left.id) == Some(true) || facts.get(right.id) == Some(true);
            if positive && null_operand {
                FilterCondition::False
            } else {
                condition.clone()
            }
        }
        FilterCondition::EqualExpressions(left, right) => {
            let left = simplify_expression(left, facts);
            let right = simplify_expression(right, facts);
            if positive && (left.is_null() || right.is_null()) {
                FilterCondition::False
            } else {
                FilterCondition::EqualExpressions(left, right)
            }
        }
        FilterCondition::Comparison {
            operator,
            left,
            right,
        } => {
            let left = simplify_expression(left, facts);
            let right = simplify_expression(right, facts);
            if positive && (left.is_null() || right.is_null()) {
                FilterCondition::False
            } else {
                FilterCondition::Comparison {
                    operator: *operator,
                    left,
                    right,
                }
            }
        }
        FilterCondition::Like {
            expression,
            pattern,
        } => {
            let expression = simplify_expression(expression, facts);
            if positive && expression.is_null() {
                FilterCondition::False
            } else {
                FilterCondition::Like {
                    expression,
                    pattern: pattern.clone(),
                }
            }
        }
    }
}

fn simplify_expression(expression: &Expression, facts: &Facts) -> Expression {
    match expression {
        Expression::Column { variable, .. } if facts.get(variable.id) == Some(true) => {
            Expression::Null(variable.sql_type)
        }
        Expression::Column { .. } | Expression::Constant(_) | Expression::Null(_) => {
            expression.clone()
        }
        Expression::Concatenation(parts) => {
            Expression::Concatenation(parts.iter().map(|p| simplify_expression(p, facts)).collect())
        }
        Expression::Coalesce(parts) => {
            Expression::coalesce(parts.iter().map(|p| simplify_expression(p, facts)).collect())
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => Expression::binary(
            *operator,
            simplify_expression(left, facts),
            simplify_expression(right, facts),
        ),
        Expression::Case { branches, sql_type } => {
            let mut earlier = facts.clone();
            let mut simplified = Vec::with_capacity(branches.len());
            for branch in branches {
                let condition = simplify_condition(&branch.condition, &earlier, true);
                let mut taken = earlier.clone();
                taken.learn(&condition, Assumed::True);
                let value = simplify_expression(&branch.value, &taken);
                earlier.learn(&condition, Assumed::NotTrue);
                simplified.push(CaseBranch { condition, value });
            }
            Expression::case(simplified, *sql_type)
        }
    }
}

impl IsNullPropagation {
    pub fn new() -> Self {
        IsNullPropagation
    }

    /// Facts every row of `model` satisfies before its filters apply.
    fn seed(&self, model: &CalculusModel, ctx: &QueryContext) -> OptimizerResult<Facts> {
        let mut facts = Facts::default();
        for source in &model.sources {
            match source {
                SourceCondition::Table(table) => {
                    let schema =
                        ctx.schema
                            .table(&table.table)
                            .ok_or_else(|| OptimizerError::UnknownTable {
                                pass: Pass::IsNullPropagation,
                                table: table.table.clone(),
                            })?;
                    for column in &table.columns {
                        if schema.column(&column.name).is_some_and(|c| !c.nullable) {
                            facts.set(column.variable.id, false);
                        }
                    }
                }
                SourceCondition::LeftJoin {
                    model: inner,
                    conditions,
                    ..
                } if conditions.contains(&FilterCondition::False)
                    || inner.filters.contains(&FilterCondition::False) =>
                {
                    for variable in source.provided_variables() {
                        facts.set(variable.id, true);
                    }
                }
                _ => {}
            }
        }
        Ok(facts)
    }

    fn simplify_model(
        &self,
        model: CalculusModel,
        ctx: &QueryContext,
    ) -> OptimizerResult<(CalculusModel, Facts)> {
        let mut facts = self.seed(&model, ctx)?;

        let mut filters = Vec::with_capacity(model.filters.len());
        for filter in &model.filters {
            let filter = simplify_condition(filter, &facts, true);
            facts.learn(&filter, Assumed::True);
            filters.push(filter);
        }

        let mut sources = Vec::with_capacity(model.sources.len());
        for source in model.sources {
            sources.push(match source {
                SourceCondition::Table(_) => source,
                SourceCondition::SubModel { id, model } => SourceCondition::SubModel {
                    id,
                    model: Box::new(self.simplify_query_model(*model, ctx)?),
                },
                SourceCondition::Union {
                    id,
                    case_variable,
                    branches,
                } => SourceCondition::Union {
                    id,
                    case_variable,
                    branches: branches
                        .into_iter()
                        .map(|branch| Ok(self.simplify_model(branch, ctx)?.0))
                        .collect::<OptimizerResult<Vec<_>>>()?,
                },
                SourceCondition::LeftJoin {
                    id,
                    model: inner,
                    conditions,
                } => {
                    let right_variables = inner.variables();
                    let (inner, inner_facts) = self.simplify_model(*inner, ctx)?;
                    let mut on_facts = facts.clone();
                    for variable in &right_variables {
                        on_facts.known.remove(&variable.id);
                    }
                    on_facts.known.extend(inner_facts.known);

                    let mut simplified = Vec::with_capacity(conditions.len());
                    for condition in &conditions {
                        let condition = simplify_condition(condition, &on_facts, true);
                        on_facts.learn(&condition, Assumed::True);
                        simplified.push(condition);
                    }
                    SourceCondition::LeftJoin {
                        id,
                        model: Box::new(inner),
                        conditions: FilterCondition::and(simplified).into_conjuncts(),
                    }
                }
            });
        }

        let assignments = model
            .assignments
            .iter()
            .map(|a| AssignmentCondition {
                variable: a.variable,
                expression: simplify_expression(&a.expression, &facts),
            })
            .collect();

        Ok((CalculusModel::new(sources, filters, assignments), facts))
    }

    fn simplify_query_model(
        &self,
        model: QueryModel,
        ctx: &QueryContext,
    ) -> OptimizerResult<QueryModel> {
        Ok(match model {
            QueryModel::Plain(model) => QueryModel::Plain(self.simplify_model(model, ctx)?.0),
            QueryModel::Modified(modified) => {
                let (model, facts) = self.simplify_model(modified.model, ctx)?;
                QueryModel::Modified(ModifiedCalculusModel {
                    model,
                    ordering: modified
                        .ordering
                        .iter()
                        .map(|o| Ordering {
                            expression: simplify_expression(&o.expression, &facts),
                            descending: o.descending,
                        })
                        .collect(),
                    limit: modified.limit,
                    offset: modified.offset,
                    distinct: modified.distinct,
                })
            }
        })
    }
}

impl RelationalOptimizerPass for IsNullPropagation {
    fn pass(&self) -> Pass {
        Pass::IsNullPropagation
    }

    fn optimize(
        &self,
        query: RelationalQuery,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>> {
        let model = self.simplify_query_model(query.model.clone(), ctx)?;
        let rewritten = RelationalQuery::new(model, query.binders.clone());
        Ok(Transformed::compare(query, rewritten))
    }
}
