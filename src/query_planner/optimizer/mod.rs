use crate::query_planner::{
    calculus::{QueryModel, RelationalQuery, SourceCondition},
    optimizer::{
        case_hoisting::CaseHoisting,
        concatenation_equality::ConcatenationEquality,
        constant_expr_equality::ConstantExpressionEquality,
        is_null_propagation::IsNullPropagation,
        numeric_string_comparison::NumericStringComparison,
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass, SparqlOptimizerPass},
        self_join_elimination::SelfJoinElimination,
        triple_pattern_pruning::TriplePatternPruning,
        union_join_pruning::UnionJoinPruning,
    },
    query_ctx::QueryContext,
};
use crate::sparql::GraphPattern;

mod case_hoisting;
mod concatenation_equality;
mod constant_expr_equality;
pub mod errors;
mod is_null_propagation;
mod numeric_string_comparison;
pub mod optimizer_pass;
pub mod rewriter;
pub mod self_join_constraints;
mod self_join_elimination;
mod triple_pattern_pruning;
mod union_join_pruning;

// Helper to recursively print model structure for debugging (TRACE level)
fn log_model_structure(model: &QueryModel, indent: usize) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }

    let prefix = "  ".repeat(indent);
    let plain = model.model();
    log::trace!(
        "{}{}(filters={}, assignments={})",
        prefix,
        match model {
            QueryModel::Plain(_) => "Model",
            QueryModel::Modified(_) => "ModifiedModel",
        },
        plain.filters.len(),
        plain.assignments.len()
    );
    for source in &plain.sources {
        match source {
            SourceCondition::Table(table) => log::trace!("{}  Table({})", prefix, table.table),
            SourceCondition::SubModel { model, .. } => log_model_structure(model, indent + 1),
            SourceCondition::Union { branches, .. } => {
                log::trace!("{}  Union({} branches)", prefix, branches.len());
                for branch in branches {
                    log_model_structure(&QueryModel::Plain(branch.clone()), indent + 2);
                }
            }
            SourceCondition::LeftJoin {
                model, conditions, ..
            } => {
                log::trace!("{}  LeftJoin(conditions={})", prefix, conditions.len());
                log_model_structure(&QueryModel::Plain((**model).clone()), indent + 2);
            }
        }
    }
}

/// Prunes the expanded SPARQL algebra before it is lowered.
pub fn optimize_sparql(pattern: GraphPattern, ctx: &QueryContext) -> OptimizerResult<GraphPattern> {
    if !ctx.config.sparql_pruning {
        return Ok(pattern);
    }

    let triple_pattern_pruning = TriplePatternPruning::new();
    let transformed = triple_pattern_pruning.optimize(pattern, ctx)?;
    let pattern = transformed.get_plan();

    let union_join_pruning = UnionJoinPruning::new();
    let transformed = union_join_pruning.optimize(pattern, ctx)?;
    let pattern = transformed.get_plan();

    Ok(pattern)
}

/// Runs the relational passes until none of them changes the query or the
/// round limit is reached.
pub fn optimize_relational(
    query: RelationalQuery,
    ctx: &QueryContext,
) -> OptimizerResult<RelationalQuery> {
    let mut passes: Vec<Box<dyn RelationalOptimizerPass>> = vec![
        Box::new(ConstantExpressionEquality::new()),
        Box::new(NumericStringComparison::new()),
        Box::new(CaseHoisting::new()),
        Box::new(ConcatenationEquality::new()),
        Box::new(IsNullPropagation::new()),
    ];
    if ctx.config.self_join_elimination {
        passes.push(Box::new(SelfJoinElimination::new()));
    }

    let mut query = query;
    for round in 0..ctx.config.max_optimizer_rounds {
        let mut changed = false;
        for pass in &passes {
            let transformed = pass.optimize(query, ctx)?;
            if transformed.is_yes() {
                log::trace!("Round {}: {} rewrote the query", round, pass.pass());
                changed = true;
            }
            query = transformed.get_plan();
        }
        if !changed {
            break;
        }
    }

    log::trace!("Relational optimization: model structure after optimization:");
    log_model_structure(&query.model, 1);

    Ok(query)
}

/// Runs `pass` on `query`, expects a rewrite, and checks that a second run
/// on the result reports no change.
#[cfg(test)]
fn assert_settles_in_one_run<P: RelationalOptimizerPass>(
    pass: &P,
    query: RelationalQuery,
    ctx: &QueryContext,
) -> RelationalQuery {
    use crate::query_planner::transformed::Transformed;

    let first = pass.optimize(query, ctx).unwrap();
    assert!(first.is_yes(), "{} should rewrite the query", pass.pass());
    let first = first.get_plan();
    assert_eq!(pass.optimize(first.clone(), ctx).unwrap(), Transformed::No(first.clone()));
    first
}

#[cfg(test)]
fn assert_pattern_settles_in_one_run<P: SparqlOptimizerPass>(
    pass: &P,
    pattern: GraphPattern,
    ctx: &QueryContext,
) -> GraphPattern {
    use crate::query_planner::transformed::Transformed;

    let first = pass.optimize(pattern, ctx).unwrap();
    assert!(first.is_yes(), "{} should rewrite the pattern", pass.pass());
    let first = first.get_plan();
    assert_eq!(pass.optimize(first.clone(), ctx).unwrap(), Transformed::No(first.clone()));
    first
}
