//! RDF terms as they appear in mappings and in SPARQL patterns.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod vocab;

/// An RDF term: IRI, blank node or literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RdfNode {
    Iri {
        value: String,
    },
    BlankNode {
        label: String,
    },
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl RdfNode {
    pub fn iri(value: impl Into<String>) -> Self {
        RdfNode::Iri {
            value: value.into(),
        }
    }

    pub fn blank(label: impl Into<String>) -> Self {
        RdfNode::BlankNode {
            label: label.into(),
        }
    }

    /// Simple literal (`xsd:string` in RDF 1.1).
    pub fn simple_literal(value: impl Into<String>) -> Self {
        RdfNode::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        RdfNode::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        RdfNode::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, RdfNode::Iri { .. })
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, RdfNode::BlankNode { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, RdfNode::Literal { .. })
    }

    /// Lexical text of the term: IRI string, blank node label or literal value.
    pub fn lexical_form(&self) -> &str {
        match self {
            RdfNode::Iri { value } => value,
            RdfNode::BlankNode { label } => label,
            RdfNode::Literal { value, .. } => value,
        }
    }
}

impl fmt::Display for RdfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfNode::Iri { value } => write!(f, "<{}>", value),
            RdfNode::BlankNode { label } => write!(f, "_:{}", label),
            RdfNode::Literal {
                value,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", value)?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(RdfNode::iri("http://ex/a").to_string(), "<http://ex/a>");
        assert_eq!(RdfNode::blank("b1").to_string(), "_:b1");
        assert_eq!(
            RdfNode::lang_literal("chat", "fr").to_string(),
            "\"chat\"@fr"
        );
        assert_eq!(
            RdfNode::typed_literal("5", vocab::XSD_INTEGER).to_string(),
            format!("\"5\"^^<{}>", vocab::XSD_INTEGER)
        );
    }

    #[test]
    fn test_json_shape() {
        let node: RdfNode =
            serde_json::from_str(r#"{"kind":"literal","value":"5","datatype":"http://www.w3.org/2001/XMLSchema#integer"}"#)
                .unwrap();
        assert_eq!(node, RdfNode::typed_literal("5", vocab::XSD_INTEGER));
        assert_eq!(node.lexical_form(), "5");
        assert!(node.is_literal());
    }
}
