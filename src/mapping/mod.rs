//! R2RML mapping metadata consumed by the compiler.
//!
//! The compiler only reads mappings through [`MappingProvider`]; the
//! YAML-loadable [`R2rmlMapping`] is the provider used by the binary and
//! by tests.
//!
//! # Example
//!
//! ```yaml
//! triples_maps:
//!   - id: Employee
//!     table: employees
//!     subject_map: { template: "http://ex.org/emp/{id}" }
//!     classes: ["http://ex.org/Employee"]
//!     predicate_object_maps:
//!       - predicate_map: { constant: { kind: iri, value: "http://ex.org/name" } }
//!         object_map: { column: name, term_type: literal }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub mod errors;
pub mod template;
pub mod term_map;

pub use errors::MappingError;
pub use template::{parse_template, TemplatePart};
pub use term_map::{
    JoinCondition, ObjectMap, PredicateObjectMap, RefObjectMap, TermMap, TermMapValue, TermType,
    TriplesMap,
};

/// Read-only access to the loaded triples maps.
pub trait MappingProvider: Send + Sync {
    fn triples_map(&self, id: &str) -> Option<&TriplesMap>;

    fn triples_maps(&self) -> Vec<&TriplesMap>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct R2rmlMapping {
    pub triples_maps: Vec<TriplesMap>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl R2rmlMapping {
    pub fn new(triples_maps: Vec<TriplesMap>) -> Result<Self, MappingError> {
        let mut mapping = Self {
            triples_maps,
            index: HashMap::new(),
        };
        mapping.rebuild_index();
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        let parsed: R2rmlMapping =
            serde_yaml::from_str(yaml).map_err(|e| MappingError::Load(e.to_string()))?;
        Self::new(parsed.triples_maps)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MappingError::Load(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .triples_maps
            .iter()
            .enumerate()
            .map(|(i, tm)| (tm.id.clone(), i))
            .collect();
    }

    fn validate(&self) -> Result<(), MappingError> {
        for tm in &self.triples_maps {
            tm.validate()?;
            for pom in &tm.predicate_object_maps {
                if let ObjectMap::Ref(ref_map) = &pom.object_map {
                    let parent = self
                        .index
                        .get(&ref_map.parent_triples_map)
                        .map(|&i| &self.triples_maps[i])
                        .ok_or_else(|| {
                            MappingError::UnknownTriplesMap(ref_map.parent_triples_map.clone())
                        })?;
                    if ref_map.join_conditions.is_empty() && parent.table != tm.table {
                        return Err(MappingError::MalformedTermMap {
                            triples_map: tm.id.clone(),
                            reason: format!(
                                "reference to `{}` without join conditions requires the same table (`{}` vs `{}`)",
                                parent.id, tm.table, parent.table
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl MappingProvider for R2rmlMapping {
    fn triples_map(&self, id: &str) -> Option<&TriplesMap> {
        self.index.get(id).map(|&i| &self.triples_maps[i])
    }

    fn triples_maps(&self) -> Vec<&TriplesMap> {
        self.triples_maps.iter().collect()
    }
}
