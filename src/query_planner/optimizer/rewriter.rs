//! Bottom-up rewriting of the filter conditions of a relational query.
//!
//! The rewriter visits every filter condition of every model (filters,
//! left-join conditions, CASE conditions inside expressions, orderings and
//! expression-set binders) in post-order and applies a rewrite function to
//! each node. Composite nodes are rebuilt through the smart constructors, so
//! constants introduced by a rewrite fold upward. When the function changes
//! a node, the result is rewritten again until it is stable.

use crate::query_planner::calculus::{
    AssignmentCondition, CalculusModel, CaseBranch, Expression, FilterCondition,
    ModifiedCalculusModel, Ordering, QueryModel, RelationalQuery, SourceCondition,
};
use crate::query_planner::value_binder::{SwitchCase, ValueBinder};

pub fn rewrite_condition<F>(condition: FilterCondition, f: &mut F) -> FilterCondition
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    let rebuilt = match condition {
        FilterCondition::Conjunction(children) => FilterCondition::and(
            children
                .into_iter()
                .map(|c| rewrite_condition(c, f))
                .collect::<Vec<_>>(),
        ),
        FilterCondition::Disjunction(children) => FilterCondition::or(
            children
                .into_iter()
                .map(|c| rewrite_condition(c, f))
                .collect::<Vec<_>>(),
        ),
        FilterCondition::Negation(inner) => FilterCondition::not(rewrite_condition(*inner, f)),
        FilterCondition::EqualExpressions(left, right) => FilterCondition::EqualExpressions(
            rewrite_expression(left, f),
            rewrite_expression(right, f),
        ),
        FilterCondition::Comparison {
            operator,
            left,
            right,
        } => FilterCondition::Comparison {
            operator,
            left: rewrite_expression(left, f),
            right: rewrite_expression(right, f),
        },
        FilterCondition::Like {
            expression,
            pattern,
        } => FilterCondition::Like {
            expression: rewrite_expression(expression, f),
            pattern,
        },
        other => other,
    };

    let rewritten = f(rebuilt.clone());
    if rewritten == rebuilt {
        rebuilt
    } else {
        rewrite_condition(rewritten, f)
    }
}

/// Rewrites the conditions nested in CASE expressions.
pub fn rewrite_expression<F>(expression: Expression, f: &mut F) -> Expression
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    match expression {
        Expression::Case { branches, sql_type } => Expression::case(
            branches
                .into_iter()
                .map(|b| CaseBranch {
                    condition: rewrite_condition(b.condition, f),
                    value: rewrite_expression(b.value, f),
                })
                .collect(),
            sql_type,
        ),
        Expression::Concatenation(parts) => {
            Expression::concat(parts.into_iter().map(|p| rewrite_expression(p, f)).collect())
        }
        Expression::Coalesce(parts) => {
            Expression::coalesce(parts.into_iter().map(|p| rewrite_expression(p, f)).collect())
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => Expression::binary(
            operator,
            rewrite_expression(*left, f),
            rewrite_expression(*right, f),
        ),
        other => other,
    }
}

fn rewrite_conditions<F>(conditions: Vec<FilterCondition>, f: &mut F) -> Vec<FilterCondition>
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    FilterCondition::and(
        conditions
            .into_iter()
            .map(|c| rewrite_condition(c, f))
            .collect::<Vec<_>>(),
    )
    .into_conjuncts()
}

pub fn rewrite_model<F>(model: CalculusModel, f: &mut F) -> CalculusModel
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    let sources = model
        .sources
        .into_iter()
        .map(|source| rewrite_source(source, f))
        .collect();
    let filters = rewrite_conditions(model.filters, f);
    let assignments = model
        .assignments
        .into_iter()
        .map(|a| AssignmentCondition {
            variable: a.variable,
            expression: rewrite_expression(a.expression, f),
        })
        .collect();
    CalculusModel::new(sources, filters, assignments)
}

fn rewrite_source<F>(source: SourceCondition, f: &mut F) -> SourceCondition
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    match source {
        SourceCondition::Table(_) => source,
        SourceCondition::SubModel { id, model } => SourceCondition::SubModel {
            id,
            model: Box::new(rewrite_query_model(*model, f)),
        },
        SourceCondition::Union {
            id,
            case_variable,
            branches,
        } => SourceCondition::Union {
            id,
            case_variable,
            branches: branches.into_iter().map(|b| rewrite_model(b, f)).collect(),
        },
        SourceCondition::LeftJoin {
            id,
            model,
            conditions,
        } => SourceCondition::LeftJoin {
            id,
            model: Box::new(rewrite_model(*model, f)),
            conditions: rewrite_conditions(conditions, f),
        },
    }
}

pub fn rewrite_query_model<F>(model: QueryModel, f: &mut F) -> QueryModel
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    match model {
        QueryModel::Plain(model) => QueryModel::Plain(rewrite_model(model, f)),
        QueryModel::Modified(modified) => QueryModel::Modified(ModifiedCalculusModel {
            model: rewrite_model(modified.model, f),
            ordering: modified
                .ordering
                .into_iter()
                .map(|o| Ordering {
                    expression: rewrite_expression(o.expression, f),
                    descending: o.descending,
                })
                .collect(),
            limit: modified.limit,
            offset: modified.offset,
            distinct: modified.distinct,
        }),
    }
}

fn rewrite_binder<F>(binder: ValueBinder, f: &mut F) -> ValueBinder
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    match binder {
        ValueBinder::ExpressionSet { name, expressions } => ValueBinder::ExpressionSet {
            name,
            expressions: expressions.map(|e| rewrite_expression(e.clone(), f)),
        },
        ValueBinder::Coalesce { name, binders } => ValueBinder::Coalesce {
            name,
            binders: binders.into_iter().map(|b| rewrite_binder(b, f)).collect(),
        },
        ValueBinder::Switch {
            name,
            case_variable,
            cases,
        } => ValueBinder::Switch {
            name,
            case_variable,
            cases: cases
                .into_iter()
                .map(|c| SwitchCase {
                    case_value: c.case_value,
                    binder: rewrite_binder(c.binder, f),
                })
                .collect(),
        },
        other => other,
    }
}

/// Rewrites every condition of `query` with `f`.
pub fn rewrite_query<F>(query: RelationalQuery, f: &mut F) -> RelationalQuery
where
    F: FnMut(FilterCondition) -> FilterCondition,
{
    RelationalQuery {
        model: rewrite_query_model(query.model, f),
        binders: query
            .binders
            .into_iter()
            .map(|b| rewrite_binder(b, f))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlType;
    use crate::query_planner::calculus::{CalculusVariable, VariableId};

    fn var(id: usize) -> CalculusVariable {
        CalculusVariable::new(VariableId(id), SqlType::Int)
    }

    #[test]
    fn test_rewrite_folds_upward() {
        let condition = FilterCondition::and(vec![
            FilterCondition::IsNull(var(0)),
            FilterCondition::or(vec![
                FilterCondition::IsNull(var(1)),
                FilterCondition::IsNull(var(2)),
            ]),
        ]);
        // every is-null on variable 1 is known false, on 0 known true
        let rewritten = rewrite_condition(condition, &mut |c| match c {
            FilterCondition::IsNull(v) if v.id == VariableId(0) => FilterCondition::True,
            FilterCondition::IsNull(v) if v.id == VariableId(1) => FilterCondition::False,
            other => other,
        });
        assert_eq!(rewritten, FilterCondition::IsNull(var(2)));
    }

    #[test]
    fn test_rewrite_reaches_case_conditions() {
        let model = CalculusModel::new(
            vec![],
            vec![],
            vec![AssignmentCondition {
                variable: var(5),
                expression: Expression::case(
                    vec![CaseBranch {
                        condition: FilterCondition::IsNull(var(0)),
                        value: Expression::int(1),
                    }],
                    SqlType::Int,
                ),
            }],
        );
        let rewritten = rewrite_model(model, &mut |c| match c {
            FilterCondition::IsNull(_) => FilterCondition::True,
            other => other,
        });
        assert_eq!(rewritten.assignments[0].expression, Expression::int(1));
    }
}
