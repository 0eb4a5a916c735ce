//! R2RML string templates (`http://ex.org/item/{id}`).
//!
//! Braces delimit column references; `\{`, `\}` and `\\` escape literal
//! characters.

use nom::{
    branch::alt,
    character::complete::{char, none_of, one_of},
    combinator::map,
    multi::{fold_many1, many0},
    sequence::{delimited, preceded},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

use super::errors::MappingError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplatePart {
    Text(String),
    Column(String),
}

fn escaped_char(input: &str) -> IResult<&str, char> {
    preceded(char('\\'), one_of("{}\\")).parse(input)
}

fn plain_char(input: &str) -> IResult<&str, char> {
    alt((escaped_char, none_of("{}\\"))).parse(input)
}

fn chars1(input: &str) -> IResult<&str, String> {
    fold_many1(plain_char, String::new, |mut acc, c| {
        acc.push(c);
        acc
    })
    .parse(input)
}

fn column_part(input: &str) -> IResult<&str, TemplatePart> {
    map(delimited(char('{'), chars1, char('}')), TemplatePart::Column).parse(input)
}

fn text_part(input: &str) -> IResult<&str, TemplatePart> {
    map(chars1, TemplatePart::Text).parse(input)
}

/// Splits a template into text and column parts.
pub fn parse_template(template: &str) -> Result<Vec<TemplatePart>, MappingError> {
    let (rest, parts) = many0(alt((column_part, text_part)))
        .parse(template)
        .map_err(|e| MappingError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

    if !rest.is_empty() {
        return Err(MappingError::InvalidTemplate {
            template: template.to_string(),
            reason: format!("unbalanced or empty braces near `{}`", rest),
        });
    }

    Ok(parts)
}

/// Column names referenced by a template, in order of appearance.
pub fn template_columns(template: &str) -> Result<Vec<String>, MappingError> {
    Ok(parse_template(template)?
        .into_iter()
        .filter_map(|part| match part {
            TemplatePart::Column(c) => Some(c),
            TemplatePart::Text(_) => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_template() {
        let parts = parse_template("http://ex.org/item/{id}").unwrap();
        assert_eq!(
            parts,
            vec![
                TemplatePart::Text("http://ex.org/item/".into()),
                TemplatePart::Column("id".into())
            ]
        );
    }

    #[test]
    fn test_parse_adjacent_columns_and_escapes() {
        let parts = parse_template("{a}{b}-\\{x\\}").unwrap();
        assert_eq!(
            parts,
            vec![
                TemplatePart::Column("a".into()),
                TemplatePart::Column("b".into()),
                TemplatePart::Text("-{x}".into()),
            ]
        );
    }

    #[test]
    fn test_template_columns() {
        assert_eq!(
            template_columns("http://ex.org/{dept}/{id}").unwrap(),
            vec!["dept".to_string(), "id".to_string()]
        );
    }

    #[test]
    fn test_unbalanced_template_is_rejected() {
        assert!(matches!(
            parse_template("http://ex.org/{id"),
            Err(MappingError::InvalidTemplate { .. })
        ));
        assert!(parse_template("http://ex.org/{}").is_err());
    }

    #[test]
    fn test_empty_template() {
        assert!(parse_template("").unwrap().is_empty());
    }
}
