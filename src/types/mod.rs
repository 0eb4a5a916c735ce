//! RDF value typing.
//!
//! Every materialized RDF term carries a *type id* (exact datatype or
//! IRI/blank-ness) and a coarse [`TypeCategory`] that selects which payload
//! slot of an expressions set is meaningful. The [`TypeCache`] interns value
//! types into stable integer ids for the lifetime of the cache.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::database::SqlType;
use crate::mapping::{TermMap, TermMapValue, TermType};
use crate::rdf::{vocab, RdfNode};

/// Coarse classification of an RDF term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    BlankNode,
    Iri,
    SimpleLiteral,
    LangString,
    Numeric,
    Boolean,
    DateTime,
    OtherLiteral,
}

impl TypeCategory {
    pub const ALL: [TypeCategory; 8] = [
        TypeCategory::BlankNode,
        TypeCategory::Iri,
        TypeCategory::SimpleLiteral,
        TypeCategory::LangString,
        TypeCategory::Numeric,
        TypeCategory::Boolean,
        TypeCategory::DateTime,
        TypeCategory::OtherLiteral,
    ];

    /// Categories whose members can be ordered against each other.
    /// Language-tagged and other literals order by lexical form, and only
    /// within one type id.
    pub const ORDERED: [TypeCategory; 6] = [
        TypeCategory::Numeric,
        TypeCategory::Boolean,
        TypeCategory::DateTime,
        TypeCategory::SimpleLiteral,
        TypeCategory::LangString,
        TypeCategory::OtherLiteral,
    ];

    /// Whether two terms of this category also need the same type id to be
    /// compared.
    pub fn compares_within_type(self) -> bool {
        matches!(self, TypeCategory::LangString | TypeCategory::OtherLiteral)
    }

    /// Integer code stored in the type-category expression.
    pub fn code(self) -> i64 {
        match self {
            TypeCategory::BlankNode => 0,
            TypeCategory::Iri => 1,
            TypeCategory::SimpleLiteral => 2,
            TypeCategory::LangString => 3,
            TypeCategory::Numeric => 4,
            TypeCategory::Boolean => 5,
            TypeCategory::DateTime => 6,
            TypeCategory::OtherLiteral => 7,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn is_literal(self) -> bool {
        !matches!(self, TypeCategory::BlankNode | TypeCategory::Iri)
    }
}

/// Exact type of an RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ValueType {
    BlankNode,
    Iri,
    SimpleLiteral,
    LangString { language: String },
    Numeric { datatype: String },
    Boolean,
    DateTime { datatype: String },
    OtherLiteral { datatype: String },
}

impl ValueType {
    pub fn category(&self) -> TypeCategory {
        match self {
            ValueType::BlankNode => TypeCategory::BlankNode,
            ValueType::Iri => TypeCategory::Iri,
            ValueType::SimpleLiteral => TypeCategory::SimpleLiteral,
            ValueType::LangString { .. } => TypeCategory::LangString,
            ValueType::Numeric { .. } => TypeCategory::Numeric,
            ValueType::Boolean => TypeCategory::Boolean,
            ValueType::DateTime { .. } => TypeCategory::DateTime,
            ValueType::OtherLiteral { .. } => TypeCategory::OtherLiteral,
        }
    }

    /// Datatype IRI of a literal type.
    pub fn datatype(&self) -> Option<&str> {
        match self {
            ValueType::BlankNode | ValueType::Iri => None,
            ValueType::SimpleLiteral => Some(vocab::XSD_STRING),
            ValueType::LangString { .. } => Some(vocab::RDF_LANG_STRING),
            ValueType::Boolean => Some(vocab::XSD_BOOLEAN),
            ValueType::Numeric { datatype }
            | ValueType::DateTime { datatype }
            | ValueType::OtherLiteral { datatype } => Some(datatype),
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            ValueType::LangString { language } => Some(language),
            _ => None,
        }
    }

    /// Value type of a literal with the given datatype.
    pub fn of_datatype(datatype: &str) -> Self {
        match DATATYPE_CATEGORIES.get(datatype) {
            Some(TypeCategory::SimpleLiteral) => ValueType::SimpleLiteral,
            Some(TypeCategory::Numeric) => ValueType::Numeric {
                datatype: datatype.to_string(),
            },
            Some(TypeCategory::Boolean) => ValueType::Boolean,
            Some(TypeCategory::DateTime) => ValueType::DateTime {
                datatype: datatype.to_string(),
            },
            _ => ValueType::OtherLiteral {
                datatype: datatype.to_string(),
            },
        }
    }

    /// Natural RDF type of a column value (R2RML natural mapping).
    pub fn natural(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::String => ValueType::SimpleLiteral,
            SqlType::Int => ValueType::Numeric {
                datatype: vocab::XSD_INTEGER.to_string(),
            },
            SqlType::Double => ValueType::Numeric {
                datatype: vocab::XSD_DOUBLE.to_string(),
            },
            SqlType::Bool => ValueType::Boolean,
            SqlType::DateTime => ValueType::DateTime {
                datatype: vocab::XSD_DATE_TIME.to_string(),
            },
        }
    }
}

lazy_static! {
    static ref DATATYPE_CATEGORIES: HashMap<&'static str, TypeCategory> = {
        let mut m = HashMap::new();
        m.insert(vocab::XSD_STRING, TypeCategory::SimpleLiteral);
        for numeric in [
            vocab::XSD_INTEGER,
            vocab::XSD_INT,
            vocab::XSD_LONG,
            vocab::XSD_SHORT,
            vocab::XSD_BYTE,
            vocab::XSD_NON_NEGATIVE_INTEGER,
            vocab::XSD_POSITIVE_INTEGER,
            vocab::XSD_DECIMAL,
            vocab::XSD_DOUBLE,
            vocab::XSD_FLOAT,
        ] {
            m.insert(numeric, TypeCategory::Numeric);
        }
        m.insert(vocab::XSD_BOOLEAN, TypeCategory::Boolean);
        m.insert(vocab::XSD_DATE_TIME, TypeCategory::DateTime);
        m.insert(vocab::XSD_DATE, TypeCategory::DateTime);
        m
    };

    static ref INTEGER_DATATYPES: Vec<&'static str> = vec![
        vocab::XSD_INTEGER,
        vocab::XSD_INT,
        vocab::XSD_LONG,
        vocab::XSD_SHORT,
        vocab::XSD_BYTE,
        vocab::XSD_NON_NEGATIVE_INTEGER,
        vocab::XSD_POSITIVE_INTEGER,
    ];
}

/// Whether a numeric datatype holds integers only.
pub fn is_integer_datatype(datatype: &str) -> bool {
    INTEGER_DATATYPES.contains(&datatype)
}

/// SQL type able to carry a column value of the given category payload.
pub fn payload_accepts(category: TypeCategory, sql_type: SqlType) -> bool {
    match category {
        TypeCategory::Numeric => sql_type.is_numeric(),
        TypeCategory::Boolean => sql_type == SqlType::Bool,
        TypeCategory::DateTime => sql_type == SqlType::DateTime,
        _ => true,
    }
}

#[derive(Debug, Default)]
struct TypeTable {
    types: Vec<ValueType>,
    ids: HashMap<ValueType, i64>,
}

impl TypeTable {
    fn intern(&mut self, value_type: &ValueType) -> i64 {
        if let Some(id) = self.ids.get(value_type) {
            return *id;
        }
        let id = self.types.len() as i64;
        self.types.push(value_type.clone());
        self.ids.insert(value_type.clone(), id);
        id
    }
}

/// Thread-safe interner of value types.
///
/// The common types are pre-registered so their ids do not depend on the
/// order in which queries are compiled.
#[derive(Debug)]
pub struct TypeCache {
    table: RwLock<TypeTable>,
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCache {
    pub fn new() -> Self {
        let mut table = TypeTable::default();
        for value_type in [
            ValueType::BlankNode,
            ValueType::Iri,
            ValueType::SimpleLiteral,
            ValueType::Boolean,
            ValueType::natural(SqlType::Int),
            ValueType::natural(SqlType::Double),
            ValueType::natural(SqlType::DateTime),
            ValueType::of_datatype(vocab::XSD_DECIMAL),
        ] {
            table.intern(&value_type);
        }
        Self {
            table: RwLock::new(table),
        }
    }

    /// Type id of a value type, registering it on first use.
    pub fn index_of(&self, value_type: &ValueType) -> i64 {
        {
            let table = self.table.read().unwrap_or_else(|e| e.into_inner());
            if let Some(id) = table.ids.get(value_type) {
                return *id;
            }
        }
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        table.intern(value_type)
    }

    pub fn value_type(&self, id: i64) -> Option<ValueType> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        usize::try_from(id)
            .ok()
            .and_then(|i| table.types.get(i).cloned())
    }

    /// Value type of a concrete RDF term.
    pub fn value_type_of_node(&self, node: &RdfNode) -> ValueType {
        match node {
            RdfNode::Iri { .. } => ValueType::Iri,
            RdfNode::BlankNode { .. } => ValueType::BlankNode,
            RdfNode::Literal {
                language: Some(language),
                ..
            } => ValueType::LangString {
                language: language.to_lowercase(),
            },
            RdfNode::Literal {
                datatype: Some(datatype),
                ..
            } => ValueType::of_datatype(datatype),
            RdfNode::Literal { .. } => ValueType::SimpleLiteral,
        }
    }

    /// Value type produced by a term map.
    ///
    /// `column_type` is the SQL type of the column of a column-valued map;
    /// it decides the natural datatype of untyped literal columns.
    /// Template-valued literals always produce strings, so a numeric,
    /// boolean or datetime datatype on a template degrades to an opaque
    /// literal type.
    pub fn value_type_of_term_map(
        &self,
        term_map: &TermMap,
        column_type: Option<SqlType>,
    ) -> ValueType {
        if let TermMapValue::Constant(node) = &term_map.value {
            return self.value_type_of_node(node);
        }

        match term_map.term_type() {
            TermType::Iri => ValueType::Iri,
            TermType::BlankNode => ValueType::BlankNode,
            TermType::Literal => {
                if let Some(language) = &term_map.language {
                    return ValueType::LangString {
                        language: language.to_lowercase(),
                    };
                }
                let value_type = match (&term_map.datatype, column_type) {
                    (Some(datatype), _) => ValueType::of_datatype(datatype),
                    (None, Some(sql_type)) if term_map.is_column_valued() => {
                        ValueType::natural(sql_type)
                    }
                    (None, _) => ValueType::SimpleLiteral,
                };
                match (&term_map.value, value_type.category()) {
                    (
                        TermMapValue::Template(_),
                        TypeCategory::Numeric | TypeCategory::Boolean | TypeCategory::DateTime,
                    ) => ValueType::OtherLiteral {
                        datatype: value_type
                            .datatype()
                            .unwrap_or(vocab::XSD_STRING)
                            .to_string(),
                    },
                    _ => value_type,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_codes_round_trip() {
        for category in TypeCategory::ALL {
            assert_eq!(TypeCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(TypeCategory::from_code(42), None);
    }

    #[test]
    fn test_common_types_have_stable_ids() {
        let a = TypeCache::new();
        let b = TypeCache::new();
        b.index_of(&ValueType::OtherLiteral {
            datatype: "http://ex.org/dt".into(),
        });
        assert_eq!(a.index_of(&ValueType::Iri), b.index_of(&ValueType::Iri));
        assert_eq!(
            a.index_of(&ValueType::natural(SqlType::Int)),
            b.index_of(&ValueType::natural(SqlType::Int))
        );
    }

    #[test]
    fn test_interning_is_idempotent() {
        let cache = TypeCache::new();
        let lang = ValueType::LangString {
            language: "en".into(),
        };
        let id = cache.index_of(&lang);
        assert_eq!(cache.index_of(&lang), id);
        assert_eq!(cache.value_type(id), Some(lang));
        assert_eq!(cache.value_type(-1), None);
    }

    #[test]
    fn test_value_type_of_nodes() {
        let cache = TypeCache::new();
        assert_eq!(
            cache.value_type_of_node(&RdfNode::typed_literal("5", vocab::XSD_INT)),
            ValueType::Numeric {
                datatype: vocab::XSD_INT.into()
            }
        );
        assert_eq!(
            cache.value_type_of_node(&RdfNode::typed_literal("x", vocab::XSD_STRING)),
            ValueType::SimpleLiteral
        );
        assert_eq!(
            cache
                .value_type_of_node(&RdfNode::lang_literal("x", "EN"))
                .language(),
            Some("en")
        );
    }

    #[test]
    fn test_value_type_of_term_maps() {
        let cache = TypeCache::new();
        assert_eq!(
            cache.value_type_of_term_map(&TermMap::literal_column("age"), Some(SqlType::Int)),
            ValueType::natural(SqlType::Int)
        );
        assert_eq!(
            cache.value_type_of_term_map(&TermMap::template("http://ex/{id}"), None),
            ValueType::Iri
        );
        assert_eq!(
            cache
                .value_type_of_term_map(
                    &TermMap::template("{a}.{b}").with_datatype(vocab::XSD_DECIMAL),
                    None
                )
                .category(),
            TypeCategory::OtherLiteral
        );
    }
}
