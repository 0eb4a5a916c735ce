//! SQL text generation for a planned [`RelationalQuery`].
//!
//! The tree walk is dialect-agnostic; every leaf (identifiers, literals,
//! casts, concatenation, paging) goes through the configured
//! [`SqlDialect`](crate::database::SqlDialect).

use crate::config::CompilerConfig;
use crate::query_planner::calculus::RelationalQuery;

mod errors;
pub mod naming;
mod to_sql;
mod to_sql_query;

pub use errors::SqlGeneratorError;
pub use to_sql::{RenderContext, ToSql};

pub fn generate_sql(
    query: &RelationalQuery,
    config: &CompilerConfig,
) -> Result<String, SqlGeneratorError> {
    let mut ctx = RenderContext::new(config.dialect.dialect(), config.default_schema.as_deref());
    let sql = ctx.render_query(query)?;
    log::debug!("Generated {} SQL:\n{}", config.dialect, sql);
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialectKind;
    use crate::database::{DialectError, SqlType};
    use crate::mapping::TermMap;
    use crate::query_planner::calculus::{
        AssignmentCondition, CalculusModel, CalculusVariable, Expression, FilterCondition,
        ModifiedCalculusModel, Ordering, QueryModel, SourceCondition, SourceId, TableColumn,
        TableSource, VariableId,
    };
    use crate::query_planner::value_binder::{BaseValueBinder, ValueBinder};

    fn var(id: usize, sql_type: SqlType) -> CalculusVariable {
        CalculusVariable::new(VariableId(id), sql_type)
    }

    fn table(source: usize, name: &str, columns: &[(&str, usize, SqlType)]) -> SourceCondition {
        SourceCondition::Table(TableSource {
            id: SourceId(source),
            table: name.into(),
            columns: columns
                .iter()
                .map(|(column, id, sql_type)| TableColumn {
                    name: column.to_string(),
                    variable: var(*id, *sql_type),
                })
                .collect(),
        })
    }

    fn binder(name: &str, column: &str, id: usize, sql_type: SqlType) -> ValueBinder {
        ValueBinder::Base(BaseValueBinder {
            name: name.into(),
            term_map: TermMap::literal_column(column),
            columns: vec![TableColumn {
                name: column.into(),
                variable: var(id, sql_type),
            }],
        })
    }

    fn generate(query: &RelationalQuery, dialect: DialectKind) -> Result<String, SqlGeneratorError> {
        let config = CompilerConfig {
            dialect,
            ..CompilerConfig::default()
        };
        generate_sql(query, &config)
    }

    #[test]
    fn test_single_table_projects_only_needed_columns() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![table(
                    0,
                    "items",
                    &[("id", 0, SqlType::Int), ("name", 1, SqlType::String)],
                )],
                vec![FilterCondition::is_not_null(var(0, SqlType::Int))],
                vec![],
            )),
            vec![binder("s", "id", 0, SqlType::Int)],
        );
        assert_eq!(
            generate(&query, DialectKind::MsSql).unwrap(),
            "SELECT [s0].[id] AS [c0]\nFROM [items] AS [s0]\nWHERE [s0].[id] IS NOT NULL"
        );
    }

    #[test]
    fn test_default_schema_qualifies_tables() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![table(0, "items", &[("id", 0, SqlType::Int)])],
                vec![],
                vec![],
            )),
            vec![binder("s", "id", 0, SqlType::Int)],
        );
        let config = CompilerConfig {
            dialect: DialectKind::PostgreSql,
            default_schema: Some("public".into()),
            ..CompilerConfig::default()
        };
        assert_eq!(
            generate_sql(&query, &config).unwrap(),
            "SELECT \"s0\".\"id\" AS \"c0\"\nFROM \"public\".\"items\" AS \"s0\""
        );
    }

    #[test]
    fn test_inner_sources_join_on_true() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![
                    table(0, "items", &[("owner", 0, SqlType::Int)]),
                    table(1, "people", &[("id", 1, SqlType::Int)]),
                ],
                vec![FilterCondition::EqualVariables(
                    var(0, SqlType::Int),
                    var(1, SqlType::Int),
                )],
                vec![],
            )),
            vec![binder("o", "owner", 0, SqlType::Int)],
        );
        assert_eq!(
            generate(&query, DialectKind::MsSql).unwrap(),
            "SELECT [s0].[owner] AS [c0]\nFROM [items] AS [s0]\nINNER JOIN [people] AS [s1] ON 1=1\nWHERE [s0].[owner] = [s1].[id]"
        );
    }

    #[test]
    fn test_union_branches_are_padded_with_typed_nulls() {
        let case = var(9, SqlType::Int);
        let branch = |source: usize, name: &str, id: usize, sql_type: SqlType, value: i64| {
            CalculusModel::new(
                vec![table(source, name, &[("v", id, sql_type)])],
                vec![],
                vec![AssignmentCondition {
                    variable: case,
                    expression: Expression::int(value),
                }],
            )
        };
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![SourceCondition::Union {
                    id: SourceId(5),
                    case_variable: case,
                    branches: vec![
                        branch(0, "a", 0, SqlType::Int, 0),
                        branch(1, "b", 1, SqlType::String, 1),
                    ],
                }],
                vec![],
                vec![],
            )),
            vec![ValueBinder::Switch {
                name: "x".into(),
                case_variable: case,
                cases: vec![],
            }, binder("a", "v", 0, SqlType::Int), binder("b", "v", 1, SqlType::String)],
        );
        let sql = generate(&query, DialectKind::PostgreSql).unwrap();
        assert_eq!(
            sql,
            "SELECT \"s5\".\"c0\" AS \"c0\", \"s5\".\"c1\" AS \"c1\", \"s5\".\"c9\" AS \"c9\"\n\
             FROM (SELECT \"s0\".\"v\" AS \"c0\", CAST(NULL AS TEXT) AS \"c1\", 0 AS \"c9\"\n\
             FROM \"a\" AS \"s0\"\n\
             UNION ALL\n\
             SELECT CAST(NULL AS BIGINT) AS \"c0\", \"s1\".\"v\" AS \"c1\", 1 AS \"c9\"\n\
             FROM \"b\" AS \"s1\") AS \"s5\""
        );
    }

    #[test]
    fn test_leading_left_join_reads_dummy_row() {
        let optional = CalculusModel::new(
            vec![table(0, "items", &[("id", 0, SqlType::Int)])],
            vec![],
            vec![],
        );
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![SourceCondition::LeftJoin {
                    id: SourceId(1),
                    model: Box::new(optional),
                    conditions: vec![],
                }],
                vec![],
                vec![],
            )),
            vec![binder("s", "id", 0, SqlType::Int)],
        );
        assert_eq!(
            generate(&query, DialectKind::MsSql).unwrap(),
            "SELECT [s1].[c0] AS [c0]\nFROM (SELECT NULL AS [c]) AS [d]\nLEFT JOIN (SELECT [s0].[id] AS [c0]\nFROM [items] AS [s0]) AS [s1] ON 1=1"
        );
    }

    #[test]
    fn test_left_join_conditions_reference_both_sides() {
        let optional = CalculusModel::new(
            vec![table(1, "people", &[("id", 1, SqlType::Int), ("name", 2, SqlType::String)])],
            vec![],
            vec![],
        );
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![
                    table(0, "items", &[("owner", 0, SqlType::Int)]),
                    SourceCondition::LeftJoin {
                        id: SourceId(2),
                        model: Box::new(optional),
                        conditions: vec![FilterCondition::EqualVariables(
                            var(0, SqlType::Int),
                            var(1, SqlType::Int),
                        )],
                    },
                ],
                vec![],
                vec![],
            )),
            vec![binder("n", "name", 2, SqlType::String)],
        );
        let sql = generate(&query, DialectKind::MsSql).unwrap();
        assert!(sql.starts_with("SELECT [s2].[c2] AS [c2]\nFROM [items] AS [s0]\n"));
        assert!(sql.contains("LEFT JOIN (SELECT [s1].[id] AS [c1], [s1].[name] AS [c2]\nFROM [people] AS [s1]) AS [s2] ON [s0].[owner] = [s2].[c1]"));
    }

    #[test]
    fn test_assignments_render_inline() {
        let assigned = var(1, SqlType::String);
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![table(0, "items", &[("name", 0, SqlType::String)])],
                vec![FilterCondition::is_not_null(assigned)],
                vec![AssignmentCondition {
                    variable: assigned,
                    expression: Expression::Concatenation(vec![
                        Expression::column(var(0, SqlType::String)),
                        Expression::string("!"),
                    ]),
                }],
            )),
            vec![ValueBinder::ExpressionSet {
                name: "x".into(),
                expressions: crate::query_planner::calculus::ExpressionsSet::typed(
                    2,
                    crate::types::TypeCategory::SimpleLiteral,
                    Expression::column(assigned),
                ),
            }],
        );
        assert_eq!(
            generate(&query, DialectKind::MsSql).unwrap(),
            "SELECT CONCAT([s0].[name], N'!') AS [c1]\nFROM [items] AS [s0]\nWHERE CONCAT([s0].[name], N'!') IS NOT NULL"
        );
    }

    fn ordered(distinct: bool, limit: Option<usize>, offset: Option<usize>) -> RelationalQuery {
        let mut modified = ModifiedCalculusModel::new(CalculusModel::new(
            vec![table(
                0,
                "items",
                &[("id", 0, SqlType::Int), ("rank", 1, SqlType::Int)],
            )],
            vec![],
            vec![],
        ));
        modified.ordering = vec![Ordering {
            expression: Expression::column(var(1, SqlType::Int)),
            descending: true,
        }];
        modified.distinct = distinct;
        modified.limit = limit;
        modified.offset = offset;
        RelationalQuery::new(
            QueryModel::Modified(modified),
            vec![binder("s", "id", 0, SqlType::Int)],
        )
    }

    #[test]
    fn test_order_and_slice_on_mssql() {
        assert_eq!(
            generate(&ordered(false, Some(5), Some(10)), DialectKind::MsSql).unwrap(),
            "SELECT [s0].[id] AS [c0]\nFROM [items] AS [s0]\nORDER BY [s0].[rank] DESC\nOFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
        assert_eq!(
            generate(&ordered(false, Some(5), None), DialectKind::MsSql).unwrap(),
            "SELECT TOP (5) [s0].[id] AS [c0]\nFROM [items] AS [s0]\nORDER BY [s0].[rank] DESC"
        );
    }

    #[test]
    fn test_distinct_with_order_is_wrapped() {
        assert_eq!(
            generate(&ordered(true, Some(3), None), DialectKind::PostgreSql).unwrap(),
            "SELECT \"o\".\"c0\"\n\
             FROM (SELECT DISTINCT \"s0\".\"id\" AS \"c0\", \"s0\".\"rank\" AS \"o0\"\n\
             FROM \"items\" AS \"s0\") AS \"o\"\n\
             ORDER BY \"o\".\"o0\" DESC\n\
             LIMIT 3"
        );
    }

    #[test]
    fn test_offset_without_order_fails_on_mssql() {
        let mut query = ordered(false, None, Some(10));
        if let QueryModel::Modified(modified) = &mut query.model {
            modified.ordering.clear();
        }
        assert_eq!(
            generate(&query, DialectKind::MsSql),
            Err(SqlGeneratorError::Dialect(
                DialectError::OffsetWithoutOrderBy { dialect: "mssql" }
            ))
        );
        assert!(generate(&query, DialectKind::PostgreSql)
            .unwrap()
            .ends_with("\nOFFSET 10"));
    }

    #[test]
    fn test_unordered_sub_model_drops_its_order() {
        let inner = ordered(false, None, None).model;
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::new(
                vec![SourceCondition::SubModel {
                    id: SourceId(3),
                    model: Box::new(inner),
                }],
                vec![],
                vec![],
            )),
            vec![binder("s", "id", 0, SqlType::Int)],
        );
        let sql = generate(&query, DialectKind::MsSql).unwrap();
        assert!(!sql.contains("ORDER BY"));
        assert!(sql.contains("AS [s3]"));
    }

    #[test]
    fn test_binder_variable_missing_from_model() {
        let query = RelationalQuery::new(
            QueryModel::Plain(CalculusModel::default()),
            vec![binder("s", "id", 4, SqlType::Int)],
        );
        assert_eq!(
            generate(&query, DialectKind::MsSql),
            Err(SqlGeneratorError::UnresolvedVariable(VariableId(4)))
        );
    }
}
