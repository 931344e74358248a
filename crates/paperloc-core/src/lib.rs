use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config_file;
pub mod entity;
pub mod join;
pub mod location;
pub mod schema;

// Re-export for convenience
pub use entity::{Citation, DetectedEntity, EntityBase, EquationEntity, Sentence, Term};
pub use join::join;
pub use location::{BoundingBox, HueLocation};
pub use schema::{
    EntitySchema, SchemaMapping, SchemaResolution, SchemaWarning, parse_schema_assignment,
    resolve_schema,
};

/// Identity shared by every detected entity.
///
/// Within one paper an entity is identified by the pair
/// `(id, source_path)`; the same `id` may repeat across source files.
pub trait Locatable {
    fn id(&self) -> &str;
    fn source_path(&self) -> &str;
}

/// A detected entity paired with every location where it was rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedEntity<E = DetectedEntity> {
    pub entity: E,
    pub locations: Vec<HueLocation>,
}

/// Everything localized for one paper, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperResult {
    /// Internal paper identifier (an arXiv id).
    pub paper_id: String,
    /// External identifier read from the paper's metadata (a Semantic Scholar id).
    pub external_id: String,
    pub localized_entities: Vec<LocalizedEntity>,
}

impl PaperResult {
    /// Number of entities with at least one location.
    pub fn located_count(&self) -> usize {
        self.localized_entities
            .iter()
            .filter(|e| !e.locations.is_empty())
            .count()
    }

    pub fn location_count(&self) -> usize {
        self.localized_entities
            .iter()
            .map(|e| e.locations.len())
            .sum()
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown entity schema `{0}` (expected one of: generic, citation, equation, term, sentence)")]
    UnknownSchema(String),
    #[error("invalid schema assignment `{0}` (expected FILE=SCHEMA)")]
    InvalidSchemaAssignment(String),
}
