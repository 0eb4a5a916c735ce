use super::{DialectError, Paging, SqlDialect, SqlType};

/// Microsoft SQL Server (2012+).
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl SqlDialect for MsSqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn native_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::String => "NVARCHAR(MAX)",
            SqlType::Int => "BIGINT",
            SqlType::Double => "FLOAT",
            SqlType::Bool => "BIT",
            SqlType::DateTime => "DATETIME2",
        }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("N'{}'", value.replace('\'', "''"))
    }

    fn bool_literal(&self, value: bool) -> String {
        format!("CAST({} AS BIT)", if value { 1 } else { 0 })
    }

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String {
        format!(
            "CAST('{}' AS DATETIME2)",
            value.format("%Y-%m-%d %H:%M:%S%.f")
        )
    }

    fn concat(&self, parts: &[String]) -> String {
        match parts {
            [] => self.string_literal(""),
            [single] => single.clone(),
            _ => format!("CONCAT({})", parts.join(", ")),
        }
    }

    // Default collations compare case-insensitively.
    fn like(&self, expression: &str, pattern: &str) -> String {
        format!("{} COLLATE Latin1_General_CS_AS LIKE {}", expression, pattern)
    }

    fn paging(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
        ordered: bool,
    ) -> Result<Paging, DialectError> {
        match (limit, offset) {
            (None, None) => Ok(Paging::default()),
            // FETCH NEXT needs a positive count; no rows is no rows at any offset.
            (Some(0), _) => Ok(Paging {
                top: Some("TOP (0)".to_string()),
                suffix: None,
            }),
            (Some(limit), None) => Ok(Paging {
                top: Some(format!("TOP ({})", limit)),
                suffix: None,
            }),
            (limit, Some(offset)) => {
                if !ordered {
                    return Err(DialectError::OffsetWithoutOrderBy {
                        dialect: self.name(),
                    });
                }
                let mut suffix = format!("OFFSET {} ROWS", offset);
                if let Some(limit) = limit {
                    suffix.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
                Ok(Paging {
                    top: None,
                    suffix: Some(suffix),
                })
            }
        }
    }
}
