//! Union/join cartesian pruning.
//!
//! A join of unions is a union over every combination of one alternative
//! per operand. Combinations in which a shared variable is bound by term
//! maps that can never agree produce no solutions and are dropped; the
//! survivors are rebuilt as a single join, a union of joins, or
//! `NotMatching`.

use std::collections::HashMap;

use crate::query_planner::{
    optimizer::{
        errors::Pass,
        optimizer_pass::{OptimizerResult, SparqlOptimizerPass},
        triple_pattern_pruning::PositionMap,
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};
use crate::sparql::GraphPattern;

pub struct UnionJoinPruning;

fn flatten_join(children: Vec<GraphPattern>, out: &mut Vec<GraphPattern>) {
    for child in children {
        match child {
            GraphPattern::Join(nested) => flatten_join(nested, out),
            other => out.push(other),
        }
    }
}

fn flatten_union(pattern: GraphPattern, out: &mut Vec<GraphPattern>) {
    match pattern {
        GraphPattern::Union(children) => {
            for child in children {
                flatten_union(child, out);
            }
        }
        other => out.push(other),
    }
}

fn join_of(mut patterns: Vec<GraphPattern>) -> GraphPattern {
    match patterns.len() {
        0 => GraphPattern::Empty,
        1 => patterns.remove(0),
        _ => GraphPattern::Join(patterns),
    }
}

fn operand_of(mut alternatives: Vec<GraphPattern>) -> GraphPattern {
    if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        GraphPattern::Union(alternatives)
    }
}

/// Term maps binding each variable of one alternative.
type Bindings<'t> = HashMap<&'t str, Vec<PositionMap<'t>>>;

impl UnionJoinPruning {
    pub fn new() -> Self {
        UnionJoinPruning
    }

    fn bindings<'t>(
        &self,
        alternative: &'t GraphPattern,
        ctx: &QueryContext<'t>,
    ) -> OptimizerResult<Bindings<'t>> {
        let mut bindings: Bindings = HashMap::new();
        if let GraphPattern::RestrictedTriple(triple) = alternative {
            for (name, position) in triple.variable_positions() {
                let map = PositionMap::resolve(triple, position, ctx, &self.pass())?;
                bindings.entry(name).or_default().push(map);
            }
        }
        Ok(bindings)
    }

    fn compatible(&self, left: &Bindings, right: &Bindings) -> OptimizerResult<bool> {
        let pass = self.pass();
        for (name, left_maps) in left {
            let Some(right_maps) = right.get(name) else {
                continue;
            };
            for l in left_maps {
                for r in right_maps {
                    if !l.compatible_with(r, &pass)? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Prunes a flattened join whose operands are given as their union
    /// alternatives.
    fn prune_combinations(
        &self,
        operands: Vec<Vec<GraphPattern>>,
        ctx: &QueryContext,
    ) -> OptimizerResult<GraphPattern> {
        let combinations = operands
            .iter()
            .try_fold(1usize, |acc, alternatives| acc.checked_mul(alternatives.len()));
        let within_limit =
            combinations.is_some_and(|count| count <= ctx.config.max_cartesian_combinations);
        if !within_limit {
            return Ok(join_of(operands.into_iter().map(operand_of).collect()));
        }
        let total = combinations.unwrap_or(0);

        let bindings = operands
            .iter()
            .map(|alternatives| {
                alternatives
                    .iter()
                    .map(|alternative| self.bindings(alternative, ctx))
                    .collect::<OptimizerResult<Vec<_>>>()
            })
            .collect::<OptimizerResult<Vec<_>>>()?;

        // Pairwise compatibility of alternatives of different operands.
        let mut pairs: HashMap<(usize, usize, usize, usize), bool> = HashMap::new();
        for i in 0..operands.len() {
            for j in i + 1..operands.len() {
                for (a, left) in bindings[i].iter().enumerate() {
                    for (b, right) in bindings[j].iter().enumerate() {
                        pairs.insert((i, a, j, b), self.compatible(left, right)?);
                    }
                }
            }
        }

        let mut survivors: Vec<Vec<usize>> = Vec::new();
        let mut choice = vec![0usize; operands.len()];
        'combinations: loop {
            let viable = (0..choice.len()).all(|i| {
                (i + 1..choice.len()).all(|j| {
                    pairs
                        .get(&(i, choice[i], j, choice[j]))
                        .copied()
                        .unwrap_or(true)
                })
            });
            if viable {
                survivors.push(choice.clone());
            }
            for position in (0..choice.len()).rev() {
                choice[position] += 1;
                if choice[position] < operands[position].len() {
                    continue 'combinations;
                }
                choice[position] = 0;
            }
            break;
        }

        log::debug!(
            "UnionJoinPruning: {} of {} combination(s) can match",
            survivors.len(),
            total
        );

        if survivors.len() == total {
            return Ok(join_of(operands.into_iter().map(operand_of).collect()));
        }

        let mut joins: Vec<GraphPattern> = survivors
            .into_iter()
            .map(|choice| {
                join_of(
                    choice
                        .into_iter()
                        .enumerate()
                        .map(|(i, a)| operands[i][a].clone())
                        .collect(),
                )
            })
            .collect();
        Ok(match joins.len() {
            0 => GraphPattern::NotMatching,
            1 => joins.remove(0),
            _ => GraphPattern::Union(joins),
        })
    }

    fn prune(&self, pattern: GraphPattern, ctx: &QueryContext) -> OptimizerResult<GraphPattern> {
        Ok(match pattern {
            GraphPattern::Empty
            | GraphPattern::NotMatching
            | GraphPattern::Triple(_)
            | GraphPattern::RestrictedTriple(_) => pattern,
            GraphPattern::Join(children) => {
                let mut flat = Vec::with_capacity(children.len());
                flatten_join(children, &mut flat);
                let mut operands = Vec::with_capacity(flat.len());
                for child in flat {
                    let mut alternatives = Vec::new();
                    flatten_union(self.prune(child, ctx)?, &mut alternatives);
                    alternatives.retain(|a| *a != GraphPattern::NotMatching);
                    if alternatives.is_empty() {
                        return Ok(GraphPattern::NotMatching);
                    }
                    operands.push(alternatives);
                }
                self.prune_combinations(operands, ctx)?
            }
            GraphPattern::Union(children) => {
                let mut alternatives = Vec::with_capacity(children.len());
                for child in children {
                    flatten_union(self.prune(child, ctx)?, &mut alternatives);
                }
                alternatives.retain(|a| *a != GraphPattern::NotMatching);
                match alternatives.len() {
                    0 => GraphPattern::NotMatching,
                    1 => alternatives.remove(0),
                    _ => GraphPattern::Union(alternatives),
                }
            }
            GraphPattern::Filter { inner, expression } => {
                GraphPattern::filter(self.prune(*inner, ctx)?, expression)
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => GraphPattern::extend(self.prune(*inner, ctx)?, variable, expression),
            GraphPattern::LeftJoin {
                left,
                right,
                condition,
            } => GraphPattern::LeftJoin {
                left: Box::new(self.prune(*left, ctx)?),
                right: Box::new(self.prune(*right, ctx)?),
                condition,
            },
            GraphPattern::Minus { left, right } => GraphPattern::Minus {
                left: Box::new(self.prune(*left, ctx)?),
                right: Box::new(self.prune(*right, ctx)?),
            },
        })
    }
}

impl SparqlOptimizerPass for UnionJoinPruning {
    fn pass(&self) -> Pass {
        Pass::UnionJoinPruning
    }

    fn optimize(
        &self,
        pattern: GraphPattern,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<GraphPattern>> {
        let pruned = self.prune(pattern.clone(), ctx)?;
        Ok(Transformed::compare(pattern, pruned))
    }
}
