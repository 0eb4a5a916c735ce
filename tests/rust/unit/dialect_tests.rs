//! Paging and identifier rules of the supported dialects.

#[cfg(test)]
mod dialect_tests {
    use r2sql::config::DialectKind;
    use r2sql::database::{DialectError, Paging, SqlDialect, SqlType};
    use test_case::test_case;

    fn paging(top: Option<&str>, suffix: Option<&str>) -> Paging {
        Paging {
            top: top.map(str::to_string),
            suffix: suffix.map(str::to_string),
        }
    }

    #[test_case(None, None, true, paging(None, None); "no paging")]
    #[test_case(Some(5), None, false, paging(Some("TOP (5)"), None); "limit only")]
    #[test_case(None, Some(10), true, paging(None, Some("OFFSET 10 ROWS")); "offset only")]
    #[test_case(Some(5), Some(10), true, paging(None, Some("OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY")); "limit and offset")]
    #[test_case(Some(0), Some(10), true, paging(Some("TOP (0)"), None); "zero limit with offset")]
    #[test_case(Some(0), Some(10), false, paging(Some("TOP (0)"), None); "zero limit with unordered offset")]
    fn test_mssql_paging(limit: Option<usize>, offset: Option<usize>, ordered: bool, expected: Paging) {
        let dialect = DialectKind::MsSql.dialect();
        assert_eq!(dialect.paging(limit, offset, ordered).unwrap(), expected);
    }

    #[test]
    fn test_mssql_offset_without_order_by() {
        let err = DialectKind::MsSql
            .dialect()
            .paging(Some(5), Some(10), false)
            .unwrap_err();
        assert!(matches!(err, DialectError::OffsetWithoutOrderBy { .. }));
    }

    #[test_case(None, None, paging(None, None); "no paging")]
    #[test_case(Some(5), None, paging(None, Some("LIMIT 5")); "limit only")]
    #[test_case(None, Some(10), paging(None, Some("OFFSET 10")); "offset only")]
    #[test_case(Some(5), Some(10), paging(None, Some("LIMIT 5 OFFSET 10")); "limit and offset")]
    fn test_postgres_paging(limit: Option<usize>, offset: Option<usize>, expected: Paging) {
        let dialect = DialectKind::PostgreSql.dialect();
        assert_eq!(dialect.paging(limit, offset, false).unwrap(), expected);
    }

    #[test_case("mssql", DialectKind::MsSql)]
    #[test_case("SqlServer", DialectKind::MsSql)]
    #[test_case("postgresql", DialectKind::PostgreSql)]
    #[test_case("postgres", DialectKind::PostgreSql)]
    fn test_dialect_names(name: &str, expected: DialectKind) {
        assert_eq!(name.parse::<DialectKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_dialect_name() {
        assert!("oracle".parse::<DialectKind>().is_err());
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(DialectKind::MsSql.dialect().quote_identifier("name"), "[name]");
        assert_eq!(
            DialectKind::PostgreSql.dialect().quote_identifier("name"),
            "\"name\""
        );
    }

    #[test]
    fn test_string_type_names() {
        assert_eq!(
            DialectKind::MsSql.dialect().native_type_name(SqlType::String),
            "NVARCHAR(MAX)"
        );
        assert_eq!(
            DialectKind::PostgreSql.dialect().native_type_name(SqlType::String),
            "TEXT"
        );
    }
}
