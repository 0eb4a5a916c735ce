use super::{DialectError, Paging, SqlDialect, SqlType};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn native_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::String => "TEXT",
            SqlType::Int => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Bool => "BOOLEAN",
            SqlType::DateTime => "TIMESTAMP",
        }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String {
        format!("TIMESTAMP '{}'", value.format("%Y-%m-%d %H:%M:%S%.f"))
    }

    fn concat(&self, parts: &[String]) -> String {
        match parts {
            [] => self.string_literal(""),
            [single] => single.clone(),
            _ => format!("({})", parts.join(" || ")),
        }
    }

    fn paging(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
        _ordered: bool,
    ) -> Result<Paging, DialectError> {
        let mut clauses = Vec::new();
        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }
        Ok(Paging {
            top: None,
            suffix: if clauses.is_empty() {
                None
            } else {
                Some(clauses.join(" "))
            },
        })
    }
}
