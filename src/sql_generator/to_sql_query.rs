//! Model rendering: SELECT statements, FROM clauses and solution modifiers.
//!
//! A nested model only projects the variables its enclosing scopes use.
//! Union branches all project the same columns, padding the ones they do
//! not provide with typed NULLs.

use std::collections::BTreeSet;

use crate::database::Paging;
use crate::query_planner::calculus::{
    CalculusModel, CalculusVariable, Expression, FilterCondition, ModifiedCalculusModel, Ordering,
    QueryModel, RelationalQuery, SourceCondition, TableSource, VariableId,
};

use super::errors::SqlGeneratorError;
use super::naming::{column_alias, source_alias, PLACEHOLDER_COLUMN};
use super::to_sql::{RenderContext, ToSql};

/// Alias of the derived table wrapped around a DISTINCT model that is
/// ordered.
const ORDERED_ALIAS: &str = "o";
/// Alias of the single-row table a model starting with a left join reads.
const DUMMY_ALIAS: &str = "d";

#[derive(Default)]
struct SelectTail<'m> {
    distinct: bool,
    /// Ordering keys projected as extra columns `o0, o1, ...`.
    key_columns: Vec<&'m Expression>,
    ordering: Vec<&'m Ordering>,
    paging: Paging,
}

fn order_key_alias(index: usize) -> String {
    format!("o{}", index)
}

/// Variables a model's own conditions and assignments read.
fn own_references(model: &CalculusModel, out: &mut BTreeSet<VariableId>) {
    for filter in &model.filters {
        filter.collect_variables(out);
    }
    for assignment in &model.assignments {
        assignment.expression.collect_variables(out);
    }
    for source in &model.sources {
        if let SourceCondition::LeftJoin { conditions, .. } = source {
            for condition in conditions {
                condition.collect_variables(out);
            }
        }
    }
}

/// Demanded variables among those `model` provides, in arena order.
fn projected(model: &CalculusModel, demand: &BTreeSet<VariableId>) -> Vec<CalculusVariable> {
    let mut columns: Vec<CalculusVariable> = model
        .variables()
        .into_iter()
        .filter(|v| demand.contains(&v.id))
        .collect();
    columns.sort_by_key(|v| v.id);
    columns
}

/// Orderings that actually sort; constants and NULLs do not.
fn effective_ordering(ordering: &[Ordering]) -> Vec<&Ordering> {
    ordering
        .iter()
        .filter(|o| o.expression.as_constant().is_none() && !o.expression.is_null())
        .collect()
}

impl<'a> RenderContext<'a> {
    /// Renders the top-level SELECT, projecting every variable the binders
    /// need.
    pub fn render_query(&mut self, query: &RelationalQuery) -> Result<String, SqlGeneratorError> {
        let provided: BTreeSet<VariableId> =
            query.model.variables().into_iter().map(|v| v.id).collect();
        let mut demand = BTreeSet::new();
        for variable in query.binder_variables() {
            if !provided.contains(&variable.id) {
                return Err(SqlGeneratorError::UnresolvedVariable(variable.id));
            }
            demand.insert(variable.id);
        }
        self.render_query_model(&query.model, &demand, true)
    }

    fn render_query_model(
        &mut self,
        model: &QueryModel,
        demand: &BTreeSet<VariableId>,
        top_level: bool,
    ) -> Result<String, SqlGeneratorError> {
        match model {
            QueryModel::Plain(plain) => {
                let columns = projected(plain, demand);
                self.render_select(plain, &columns, demand, SelectTail::default())
            }
            QueryModel::Modified(modified) => self.render_modified(modified, demand, top_level),
        }
    }

    fn render_modified(
        &mut self,
        modified: &ModifiedCalculusModel,
        demand: &BTreeSet<VariableId>,
        top_level: bool,
    ) -> Result<String, SqlGeneratorError> {
        // A derived table is unordered unless the order decides its slice.
        let ordering = if top_level || modified.is_sliced() {
            effective_ordering(&modified.ordering)
        } else {
            vec![]
        };
        let paging = self
            .dialect
            .paging(modified.limit, modified.offset, !ordering.is_empty())?;

        let columns = projected(&modified.model, demand);
        let mut inner_demand = demand.clone();
        for o in &ordering {
            o.expression.collect_variables(&mut inner_demand);
        }

        if !modified.distinct || ordering.is_empty() {
            let tail = SelectTail {
                distinct: modified.distinct,
                key_columns: vec![],
                ordering,
                paging,
            };
            return self.render_select(&modified.model, &columns, &inner_demand, tail);
        }

        // DISTINCT ... ORDER BY over keys that need not be projected: sort
        // the distinct rows in an outer SELECT.
        let tail = SelectTail {
            distinct: true,
            key_columns: ordering.iter().map(|o| &o.expression).collect(),
            ordering: vec![],
            paging: Paging::default(),
        };
        let inner = self.render_select(&modified.model, &columns, &inner_demand, tail)?;

        let outer_alias = self.quote(ORDERED_ALIAS);
        let projection = if columns.is_empty() {
            format!("{}.{}", outer_alias, self.quote(PLACEHOLDER_COLUMN))
        } else {
            columns
                .iter()
                .map(|v| format!("{}.{}", outer_alias, self.quote(&column_alias(v.id))))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let keys = ordering
            .iter()
            .enumerate()
            .map(|(i, o)| {
                format!(
                    "{}.{}{}",
                    outer_alias,
                    self.quote(&order_key_alias(i)),
                    if o.descending { " DESC" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = String::from("SELECT ");
        if let Some(top) = &paging.top {
            sql.push_str(top);
            sql.push(' ');
        }
        sql.push_str(&projection);
        sql.push_str(&format!("\nFROM ({}) AS {}", inner, outer_alias));
        sql.push_str(&format!("\nORDER BY {}", keys));
        if let Some(suffix) = &paging.suffix {
            sql.push('\n');
            sql.push_str(suffix);
        }
        Ok(sql)
    }

    /// Renders one SELECT over `model` whose output columns are `columns`.
    /// A column the model does not provide is a typed NULL.
    fn render_select(
        &mut self,
        model: &CalculusModel,
        columns: &[CalculusVariable],
        demand: &BTreeSet<VariableId>,
        tail: SelectTail,
    ) -> Result<String, SqlGeneratorError> {
        let mut full_demand = demand.clone();
        own_references(model, &mut full_demand);

        // Nested sources are rendered before this model's scope is entered.
        let mut from = Vec::with_capacity(model.sources.len());
        for source in &model.sources {
            from.push(self.render_source(source, &full_demand)?);
        }

        self.scopes.enter(model);
        let result = self.render_select_clauses(model, columns, from, tail);
        self.scopes.leave();
        result
    }

    fn render_select_clauses(
        &self,
        model: &CalculusModel,
        columns: &[CalculusVariable],
        from: Vec<RenderedSource>,
        tail: SelectTail,
    ) -> Result<String, SqlGeneratorError> {
        let provided: BTreeSet<VariableId> = model.variables().into_iter().map(|v| v.id).collect();

        let mut projection = Vec::with_capacity(columns.len() + tail.key_columns.len());
        for variable in columns {
            let value = if provided.contains(&variable.id) {
                self.variable_sql(variable.id)?
            } else {
                self.dialect.null_of_type(variable.sql_type)
            };
            projection.push(format!(
                "{} AS {}",
                value,
                self.quote(&column_alias(variable.id))
            ));
        }
        for (i, key) in tail.key_columns.iter().enumerate() {
            projection.push(format!(
                "{} AS {}",
                key.to_sql(self)?,
                self.quote(&order_key_alias(i))
            ));
        }
        if projection.is_empty() {
            projection.push(format!("NULL AS {}", self.quote(PLACEHOLDER_COLUMN)));
        }

        let mut sql = String::from("SELECT ");
        if tail.distinct {
            sql.push_str("DISTINCT ");
        }
        if let Some(top) = &tail.paging.top {
            sql.push_str(top);
            sql.push(' ');
        }
        sql.push_str(&projection.join(", "));

        for (index, source) in from.into_iter().enumerate() {
            match source {
                RenderedSource::Inner(table) if index == 0 => {
                    sql.push_str(&format!("\nFROM {}", table));
                }
                RenderedSource::Inner(table) => {
                    sql.push_str(&format!("\nINNER JOIN {} ON 1=1", table));
                }
                RenderedSource::Left { table, conditions } => {
                    if index == 0 {
                        sql.push_str(&format!(
                            "\nFROM (SELECT NULL AS {}) AS {}",
                            self.quote(PLACEHOLDER_COLUMN),
                            self.quote(DUMMY_ALIAS)
                        ));
                    }
                    let on = if conditions.is_empty() {
                        "1=1".to_string()
                    } else {
                        conditions
                            .iter()
                            .map(|c| c.to_sql(self))
                            .collect::<Result<Vec<_>, _>>()?
                            .join(" AND ")
                    };
                    sql.push_str(&format!("\nLEFT JOIN {} ON {}", table, on));
                }
            }
        }

        if !model.filters.is_empty() {
            let filters = model
                .filters
                .iter()
                .map(|f| f.to_sql(self))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&format!("\nWHERE {}", filters.join(" AND ")));
        }

        if !tail.ordering.is_empty() {
            let keys = tail
                .ordering
                .iter()
                .map(|o| {
                    Ok(format!(
                        "{}{}",
                        o.expression.to_sql(self)?,
                        if o.descending { " DESC" } else { "" }
                    ))
                })
                .collect::<Result<Vec<_>, SqlGeneratorError>>()?;
            sql.push_str(&format!("\nORDER BY {}", keys.join(", ")));
        }
        if let Some(suffix) = &tail.paging.suffix {
            sql.push('\n');
            sql.push_str(suffix);
        }
        Ok(sql)
    }

    fn render_table(&self, table: &TableSource) -> String {
        let name = match self.default_schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(&table.table)),
            None => self.quote(&table.table),
        };
        format!("{} AS {}", name, self.quote(&source_alias(table.id)))
    }

    fn render_source<'s>(
        &mut self,
        source: &'s SourceCondition,
        demand: &BTreeSet<VariableId>,
    ) -> Result<RenderedSource<'s>, SqlGeneratorError> {
        let alias = self.quote(&source_alias(source.id()));
        Ok(match source {
            SourceCondition::Table(table) => RenderedSource::Inner(self.render_table(table)),
            SourceCondition::SubModel { model, .. } => {
                let sql = self.render_query_model(model, demand, false)?;
                RenderedSource::Inner(format!("({}) AS {}", sql, alias))
            }
            SourceCondition::Union { branches, .. } => {
                let mut columns: Vec<CalculusVariable> = source
                    .provided_variables()
                    .into_iter()
                    .filter(|v| demand.contains(&v.id))
                    .collect();
                columns.sort_by_key(|v| v.id);

                let rendered = if branches.is_empty() {
                    let nothing = CalculusModel::new(vec![], vec![FilterCondition::False], vec![]);
                    vec![self.render_select(&nothing, &columns, demand, SelectTail::default())?]
                } else {
                    branches
                        .iter()
                        .map(|branch| {
                            self.render_select(branch, &columns, demand, SelectTail::default())
                        })
                        .collect::<Result<Vec<_>, _>>()?
                };
                RenderedSource::Inner(format!("({}) AS {}", rendered.join("\nUNION ALL\n"), alias))
            }
            SourceCondition::LeftJoin {
                model, conditions, ..
            } => {
                let columns = projected(model, demand);
                let sql = self.render_select(model, &columns, demand, SelectTail::default())?;
                RenderedSource::Left {
                    table: format!("({}) AS {}", sql, alias),
                    conditions,
                }
            }
        })
    }
}

enum RenderedSource<'s> {
    Inner(String),
    /// ON conditions are rendered once the owning model's scope is entered.
    Left {
        table: String,
        conditions: &'s [FilterCondition],
    },
}
