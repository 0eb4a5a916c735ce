//! FILTER and BIND lowering.

use crate::query_planner::calculus::{
    AssignmentCondition, Expression, QueryModel, RelationalQuery,
};
use crate::query_planner::errors::QueryPlannerError;
use crate::query_planner::lowering::{lower_sparql_condition, lower_sparql_expression};
use crate::query_planner::query_ctx::QueryContext;
use crate::query_planner::value_binder::ValueBinder;
use crate::sparql::SparqlExpression;

use super::into_plain;

pub fn build_filter(
    inner: RelationalQuery,
    expression: &SparqlExpression,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    let condition = lower_sparql_condition(expression, &inner.binders, ctx)?.into_filter();
    let model = into_plain(inner.model, ctx).with_filters(vec![condition]);
    Ok(RelationalQuery::new(QueryModel::Plain(model), inner.binders))
}

/// BIND: a plain variable reuses its binder. Otherwise every computed slot
/// of the lowered expression is assigned to a fresh variable so the binder
/// only reads constants and columns.
pub fn build_extend(
    inner: RelationalQuery,
    variable: &str,
    expression: &SparqlExpression,
    ctx: &mut QueryContext,
) -> Result<RelationalQuery, QueryPlannerError> {
    if inner.binder(variable).is_some() {
        return Err(QueryPlannerError::VariableAlreadyBound(variable.to_string()));
    }
    if let SparqlExpression::Variable(source) = expression {
        let binder = match inner.binder(source) {
            Some(binder) => binder.renamed(variable),
            None => ValueBinder::empty(variable),
        };
        let mut binders = inner.binders;
        binders.push(binder);
        return Ok(RelationalQuery::new(inner.model, binders));
    }

    let lowered = lower_sparql_expression(expression, &inner.binders, ctx)?;
    let mut model = into_plain(inner.model, ctx);

    let expressions = lowered.map(|slot| match slot {
        Expression::Constant(_) | Expression::Null(_) | Expression::Column { .. } => slot.clone(),
        computed => {
            let assigned = ctx.new_variable(computed.sql_type());
            model.assignments.push(AssignmentCondition {
                variable: assigned,
                expression: computed.clone(),
            });
            Expression::column(assigned)
        }
    });

    let mut binders = inner.binders;
    binders.push(ValueBinder::ExpressionSet {
        name: variable.to_string(),
        expressions,
    });
    Ok(RelationalQuery::new(QueryModel::Plain(model), binders))
}
