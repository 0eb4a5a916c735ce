//! R2RML term maps.
//!
//! A term map describes how one RDF term of a generated triple is derived
//! from a row of the logical table: as a constant, from a single column, or
//! by interpolating columns into a string template.

use serde::{Deserialize, Serialize};

use super::errors::MappingError;
use super::template::{parse_template, template_columns, TemplatePart};
use crate::rdf::RdfNode;

/// R2RML term type (`rr:termType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermType {
    Iri,
    BlankNode,
    Literal,
}

/// The value-producing part of a term map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermMapValue {
    Constant(RdfNode),
    Column(String),
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermMap {
    #[serde(flatten)]
    pub value: TermMapValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_type: Option<TermType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TermMap {
    pub fn constant(node: RdfNode) -> Self {
        Self {
            value: TermMapValue::Constant(node),
            term_type: None,
            datatype: None,
            language: None,
        }
    }

    pub fn constant_iri(iri: impl Into<String>) -> Self {
        Self::constant(RdfNode::iri(iri))
    }

    /// Column-valued term map. Without an explicit term type it produces IRIs
    /// (subject/predicate default); use [`TermMap::literal_column`] for objects.
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            value: TermMapValue::Column(column.into()),
            term_type: None,
            datatype: None,
            language: None,
        }
    }

    pub fn literal_column(column: impl Into<String>) -> Self {
        Self::column(column).with_term_type(TermType::Literal)
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self {
            value: TermMapValue::Template(template.into()),
            term_type: None,
            datatype: None,
            language: None,
        }
    }

    pub fn with_term_type(mut self, term_type: TermType) -> Self {
        self.term_type = Some(term_type);
        self
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self.term_type = Some(TermType::Literal);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self.term_type = Some(TermType::Literal);
        self
    }

    pub fn is_constant_valued(&self) -> bool {
        matches!(self.value, TermMapValue::Constant(_))
    }

    pub fn is_column_valued(&self) -> bool {
        matches!(self.value, TermMapValue::Column(_))
    }

    pub fn is_template_valued(&self) -> bool {
        matches!(self.value, TermMapValue::Template(_))
    }

    pub fn as_constant(&self) -> Option<&RdfNode> {
        match &self.value {
            TermMapValue::Constant(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&str> {
        match &self.value {
            TermMapValue::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&str> {
        match &self.value {
            TermMapValue::Template(template) => Some(template),
            _ => None,
        }
    }

    /// Effective term type following the R2RML defaulting rules: constants
    /// produce their own kind, datatype/language force literals, anything
    /// else defaults to IRI.
    pub fn term_type(&self) -> TermType {
        if let Some(term_type) = self.term_type {
            return term_type;
        }
        match &self.value {
            TermMapValue::Constant(RdfNode::Iri { .. }) => TermType::Iri,
            TermMapValue::Constant(RdfNode::BlankNode { .. }) => TermType::BlankNode,
            TermMapValue::Constant(RdfNode::Literal { .. }) => TermType::Literal,
            _ if self.datatype.is_some() || self.language.is_some() => TermType::Literal,
            _ => TermType::Iri,
        }
    }

    pub fn is_iri(&self) -> bool {
        self.term_type() == TermType::Iri
    }

    pub fn is_literal(&self) -> bool {
        self.term_type() == TermType::Literal
    }

    /// Parsed template parts, `None` for non-template maps.
    pub fn template_parts(&self) -> Result<Option<Vec<TemplatePart>>, MappingError> {
        match &self.value {
            TermMapValue::Template(template) => Ok(Some(parse_template(template)?)),
            _ => Ok(None),
        }
    }

    /// Table columns this term map reads.
    pub fn referenced_columns(&self) -> Result<Vec<String>, MappingError> {
        match &self.value {
            TermMapValue::Constant(_) => Ok(vec![]),
            TermMapValue::Column(column) => Ok(vec![column.clone()]),
            TermMapValue::Template(template) => template_columns(template),
        }
    }
}

/// A `(child column, parent column)` pair of a referencing object map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinCondition {
    pub child_column: String,
    pub parent_column: String,
}

/// Object map referencing the subjects of another triples map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefObjectMap {
    pub parent_triples_map: String,
    #[serde(default)]
    pub join_conditions: Vec<JoinCondition>,
}

impl RefObjectMap {
    pub fn new(
        parent_triples_map: impl Into<String>,
        child_column: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            parent_triples_map: parent_triples_map.into(),
            join_conditions: vec![JoinCondition {
                child_column: child_column.into(),
                parent_column: parent_column.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectMap {
    Ref(RefObjectMap),
    Term(TermMap),
}

impl ObjectMap {
    pub fn as_term_map(&self) -> Option<&TermMap> {
        match self {
            ObjectMap::Term(term_map) => Some(term_map),
            ObjectMap::Ref(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateObjectMap {
    pub predicate_map: TermMap,
    pub object_map: ObjectMap,
}

/// A logical table plus the subject map and predicate-object maps that
/// turn each of its rows into triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriplesMap {
    pub id: String,
    pub table: String,
    pub subject_map: TermMap,
    /// `rr:class` IRIs; each yields an `rdf:type` triple for every subject.
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub predicate_object_maps: Vec<PredicateObjectMap>,
}

impl TriplesMap {
    pub fn new(id: impl Into<String>, table: impl Into<String>, subject_map: TermMap) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            subject_map,
            classes: vec![],
            predicate_object_maps: vec![],
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_predicate_object(mut self, predicate_map: TermMap, object_map: ObjectMap) -> Self {
        self.predicate_object_maps.push(PredicateObjectMap {
            predicate_map,
            object_map,
        });
        self
    }

    fn malformed(&self, reason: impl Into<String>) -> MappingError {
        MappingError::MalformedTermMap {
            triples_map: self.id.clone(),
            reason: reason.into(),
        }
    }

    /// Checks the structural R2RML constraints on every term map.
    pub fn validate(&self) -> Result<(), MappingError> {
        self.validate_term_map(&self.subject_map, "subject map")?;
        if self.subject_map.is_literal() {
            return Err(self.malformed("subject map cannot produce literals"));
        }

        for pom in &self.predicate_object_maps {
            self.validate_term_map(&pom.predicate_map, "predicate map")?;
            if !pom.predicate_map.is_iri() {
                return Err(self.malformed("predicate map must produce IRIs"));
            }
            if let ObjectMap::Term(object_map) = &pom.object_map {
                self.validate_term_map(object_map, "object map")?;
            }
        }
        Ok(())
    }

    fn validate_term_map(&self, term_map: &TermMap, what: &str) -> Result<(), MappingError> {
        if term_map.datatype.is_some() && term_map.language.is_some() {
            return Err(self.malformed(format!(
                "{} declares both a datatype and a language tag",
                what
            )));
        }
        if (term_map.datatype.is_some() || term_map.language.is_some()) && !term_map.is_literal() {
            return Err(self.malformed(format!(
                "{} declares a datatype or language but does not produce literals",
                what
            )));
        }
        if let TermMapValue::Constant(node) = &term_map.value {
            let kind_matches = match term_map.term_type() {
                TermType::Iri => node.is_iri(),
                TermType::BlankNode => node.is_blank_node(),
                TermType::Literal => node.is_literal(),
            };
            if !kind_matches {
                return Err(self.malformed(format!(
                    "{} constant {} contradicts its term type",
                    what, node
                )));
            }
        }
        if term_map.is_template_valued() {
            term_map.template_parts()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::vocab;

    #[test]
    fn test_default_term_types() {
        assert_eq!(TermMap::column("id").term_type(), TermType::Iri);
        assert_eq!(TermMap::literal_column("name").term_type(), TermType::Literal);
        assert_eq!(
            TermMap::column("age")
                .with_datatype(vocab::XSD_INTEGER)
                .term_type(),
            TermType::Literal
        );
        assert_eq!(
            TermMap::constant(RdfNode::simple_literal("x")).term_type(),
            TermType::Literal
        );
        assert_eq!(TermMap::template("http://ex/{id}").term_type(), TermType::Iri);
    }

    #[test]
    fn test_referenced_columns() {
        let map = TermMap::template("http://ex/{dept}/{id}");
        assert_eq!(map.referenced_columns().unwrap(), vec!["dept", "id"]);
        assert!(TermMap::constant_iri("http://ex/p")
            .referenced_columns()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_validate_rejects_literal_subject() {
        let tm = TriplesMap::new("tm", "t", TermMap::literal_column("id"));
        assert!(matches!(
            tm.validate(),
            Err(MappingError::MalformedTermMap { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_literal_predicate() {
        let tm = TriplesMap::new("tm", "t", TermMap::template("http://ex/{id}"))
            .with_predicate_object(
                TermMap::constant(RdfNode::simple_literal("p")),
                ObjectMap::Term(TermMap::literal_column("name")),
            );
        assert!(tm.validate().is_err());
    }

    #[test]
    fn test_object_map_yaml_forms() {
        let term: ObjectMap = serde_yaml::from_str("column: name\nterm_type: literal\n").unwrap();
        assert_eq!(term, ObjectMap::Term(TermMap::literal_column("name")));

        let reference: ObjectMap = serde_yaml::from_str(
            "parent_triples_map: Dept\njoin_conditions:\n  - child_column: dept_id\n    parent_column: id\n",
        )
        .unwrap();
        assert_eq!(reference, ObjectMap::Ref(RefObjectMap::new("Dept", "dept_id", "id")));
    }
}
