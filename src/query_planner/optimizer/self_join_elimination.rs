//! Self-join elimination.
//!
//! Merges table sources of one model that provably read the same row (see
//! [`SelfJoinConstraints`]). The merged source disappears and its variables
//! are replaced by the survivor's, across the whole query so that outer
//! models and binders keep resolving.

use std::collections::HashMap;

use crate::query_planner::{
    calculus::{
        CalculusModel, CalculusVariable, ModifiedCalculusModel, QueryModel, RelationalQuery,
        SourceCondition, TableColumn, TableSource, VariableId,
    },
    optimizer::{
        errors::{OptimizerError, Pass},
        optimizer_pass::{OptimizerResult, RelationalOptimizerPass},
        self_join_constraints::SelfJoinConstraints,
    },
    query_ctx::QueryContext,
    transformed::Transformed,
};

pub struct SelfJoinElimination;

type Substitution = HashMap<VariableId, CalculusVariable>;

impl SelfJoinElimination {
    pub fn new() -> Self {
        SelfJoinElimination
    }

    fn merge_tables(
        &self,
        sources: Vec<SourceCondition>,
        constraints: &SelfJoinConstraints,
        ctx: &QueryContext,
        substitution: &mut Substitution,
    ) -> OptimizerResult<Vec<SourceCondition>> {
        let mut slots: Vec<Option<SourceCondition>> = sources.into_iter().map(Some).collect();
        for i in 0..slots.len() {
            let Some(SourceCondition::Table(mut survivor)) = slots[i].take() else {
                continue;
            };
            let schema = ctx
                .schema
                .table(&survivor.table)
                .ok_or_else(|| OptimizerError::UnknownTable {
                    pass: Pass::SelfJoinElimination,
                    table: survivor.table.clone(),
                })?;
            for slot in slots.iter_mut().skip(i + 1) {
                let mergeable = matches!(
                    slot,
                    Some(SourceCondition::Table(other))
                        if constraints.can_merge(schema, &survivor, other)
                );
                if !mergeable {
                    continue;
                }
                if let Some(SourceCondition::Table(merged)) = slot.take() {
                    log::debug!(
                        "SelfJoinElimination: merging source {:?} into {:?} on `{}`",
                        merged.id,
                        survivor.id,
                        survivor.table
                    );
                    absorb(&mut survivor, merged, substitution);
                }
            }
            slots[i] = Some(SourceCondition::Table(survivor));
        }
        Ok(slots.into_iter().flatten().collect())
    }

    fn eliminate_in_model(
        &self,
        model: CalculusModel,
        ctx: &QueryContext,
        substitution: &mut Substitution,
    ) -> OptimizerResult<CalculusModel> {
        let mut sources = Vec::with_capacity(model.sources.len());
        for source in model.sources {
            sources.push(match source {
                SourceCondition::Table(_) => source,
                SourceCondition::SubModel { id, model } => SourceCondition::SubModel {
                    id,
                    model: Box::new(self.eliminate_in_query_model(*model, ctx, substitution)?),
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
                        .map(|branch| self.eliminate_in_model(branch, ctx, substitution))
                        .collect::<OptimizerResult<Vec<_>>>()?,
                },
                SourceCondition::LeftJoin {
                    id,
                    model,
                    conditions,
                } => SourceCondition::LeftJoin {
                    id,
                    model: Box::new(self.eliminate_in_model(*model, ctx, substitution)?),
                    conditions,
                },
            });
        }

        let constraints = SelfJoinConstraints::from_filters(&model.filters);
        let sources = self.merge_tables(sources, &constraints, ctx, substitution)?;
        Ok(CalculusModel {
            sources,
            filters: model.filters,
            assignments: model.assignments,
        })
    }

    fn eliminate_in_query_model(
        &self,
        model: QueryModel,
        ctx: &QueryContext,
        substitution: &mut Substitution,
    ) -> OptimizerResult<QueryModel> {
        Ok(match model {
            QueryModel::Plain(model) => {
                QueryModel::Plain(self.eliminate_in_model(model, ctx, substitution)?)
            }
            QueryModel::Modified(modified) => QueryModel::Modified(ModifiedCalculusModel {
                model: self.eliminate_in_model(modified.model, ctx, substitution)?,
                ..modified
            }),
        })
    }
}

/// Moves the columns of `merged` onto `survivor`, recording the renaming of
/// columns both sources read.
fn absorb(survivor: &mut TableSource, merged: TableSource, substitution: &mut Substitution) {
    for column in merged.columns {
        match survivor.variable_of(&column.name) {
            Some(existing) => {
                substitution.insert(column.variable.id, existing);
            }
            None => survivor.columns.push(TableColumn {
                name: column.name,
                variable: column.variable,
            }),
        }
    }
}

impl RelationalOptimizerPass for SelfJoinElimination {
    fn pass(&self) -> Pass {
        Pass::SelfJoinElimination
    }

    fn optimize(
        &self,
        query: RelationalQuery,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>> {
        let mut substitution = Substitution::new();
        let model = self.eliminate_in_query_model(query.model.clone(), ctx, &mut substitution)?;
        if substitution.is_empty() && model == query.model {
            return Ok(Transformed::No(query));
        }
        let merged = RelationalQuery::new(model, query.binders.clone()).substitute(&substitution);
        Ok(Transformed::compare(query, merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::database::{ColumnSchema, InMemorySchema, SqlType, TableSchema};
    use crate::mapping::{R2rmlMapping, TermMap};
    use crate::query_planner::calculus::{FilterCondition, SourceId};
    use crate::query_planner::value_binder::{BaseValueBinder, ValueBinder};
    use crate::types::TypeCache;

    fn var(id: usize, sql_type: SqlType) -> CalculusVariable {
        CalculusVariable::new(VariableId(id), sql_type)
    }

    fn people(id: usize, key: usize, name: usize) -> SourceCondition {
        SourceCondition::Table(TableSource {
            id: SourceId(id),
            table: "people".into(),
            columns: vec![
                TableColumn {
                    name: "id".into(),
                    variable: var(key, SqlType::Int),
                },
                TableColumn {
                    name: "name".into(),
                    variable: var(name, SqlType::String),
                },
            ],
        })
    }

    fn run(query: RelationalQuery) -> Transformed<RelationalQuery> {
        let schema = InMemorySchema::new(vec![TableSchema::new(
            "people",
            vec![
                ColumnSchema::new("id", SqlType::Int, false),
                ColumnSchema::new("name", SqlType::String, true),
            ],
        )
        .with_primary_key(&["id"])])
        .unwrap();
        let mapping = R2rmlMapping::default();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        SelfJoinElimination::new().optimize(query, &ctx).unwrap()
    }

    fn name_binder(variable: usize) -> ValueBinder {
        ValueBinder::Base(BaseValueBinder {
            name: "name".into(),
            term_map: TermMap::literal_column("name"),
            columns: vec![TableColumn {
                name: "name".into(),
                variable: var(variable, SqlType::String),
            }],
        })
    }

    #[test]
    fn test_sources_joined_on_primary_key_merge() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![people(0, 0, 1), people(1, 2, 3)],
                vec![FilterCondition::EqualVariables(
                    var(0, SqlType::Int),
                    var(2, SqlType::Int),
                )],
                vec![],
            )),
            vec![name_binder(3)],
        );
        let merged = run(query);
        assert!(merged.is_yes());
        let merged = merged.get_plan();
        let model = merged.model.model();
        assert_eq!(model.sources, vec![people(0, 0, 1)]);
        assert_eq!(
            model.filters,
            vec![FilterCondition::is_not_null(var(0, SqlType::Int))]
        );
        assert_eq!(merged.binders, vec![name_binder(1)]);
    }

    #[test]
    fn test_sources_joined_on_non_key_column_stay() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![people(0, 0, 1), people(1, 2, 3)],
                vec![FilterCondition::EqualVariables(
                    var(1, SqlType::String),
                    var(3, SqlType::String),
                )],
                vec![],
            )),
            vec![],
        );
        assert!(!run(query).is_yes());
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let schema = InMemorySchema::new(vec![TableSchema::new(
            "people",
            vec![
                ColumnSchema::new("id", SqlType::Int, false),
                ColumnSchema::new("name", SqlType::String, true),
            ],
        )
        .with_primary_key(&["id"])])
        .unwrap();
        let mapping = R2rmlMapping::default();
        let cache = TypeCache::new();
        let config = CompilerConfig::default();
        let ctx = QueryContext::new(&mapping, &schema, &cache, &config);
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![people(0, 0, 1), people(1, 2, 3), people(2, 4, 5)],
                vec![
                    FilterCondition::EqualVariables(var(0, SqlType::Int), var(2, SqlType::Int)),
                    FilterCondition::EqualVariables(var(2, SqlType::Int), var(4, SqlType::Int)),
                ],
                vec![],
            )),
            vec![name_binder(5)],
        );
        let merged = crate::query_planner::optimizer::assert_settles_in_one_run(
            &SelfJoinElimination::new(),
            query,
            &ctx,
        );
        assert_eq!(merged.model.model().sources, vec![people(0, 0, 1)]);
    }
}
