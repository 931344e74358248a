//! Which row layout an entity file uses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CoreError;

/// Concrete row layout of an entity file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySchema {
    /// Only the identity columns shared by all entities.
    #[default]
    Generic,
    Citation,
    Equation,
    Term,
    Sentence,
}

impl EntitySchema {
    pub const ALL: [EntitySchema; 5] = [
        EntitySchema::Generic,
        EntitySchema::Citation,
        EntitySchema::Equation,
        EntitySchema::Term,
        EntitySchema::Sentence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Citation => "citation",
            Self::Equation => "equation",
            Self::Term => "term",
            Self::Sentence => "sentence",
        }
    }
}

impl fmt::Display for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntitySchema {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|schema| schema.name() == wanted)
            .ok_or_else(|| CoreError::UnknownSchema(s.to_string()))
    }
}

/// How to choose a schema for each entity file of a paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMapping {
    /// Every file uses the same schema.
    Single(EntitySchema),
    /// Exact file name (not path) to schema.
    ByFileName(BTreeMap<String, EntitySchema>),
}

impl SchemaMapping {
    pub fn by_file_name<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, EntitySchema)>,
        S: Into<String>,
    {
        Self::ByFileName(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Why an entity file fell back to [`EntitySchema::Generic`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    #[error("no entity schema configured; loading only generic entity properties from {file_name}")]
    NoMapping { file_name: String },
    #[error("no entity schema specified for file {file_name}; only generic entity properties will be loaded")]
    UnmappedFile { file_name: String },
}

impl SchemaWarning {
    pub fn file_name(&self) -> &str {
        match self {
            Self::NoMapping { file_name } | Self::UnmappedFile { file_name } => file_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaResolution {
    pub schema: EntitySchema,
    pub warning: Option<SchemaWarning>,
}

/// Pick the schema for one entity file.
///
/// Falling back to the generic schema is never an error; the reason is
/// returned in `warning` for the caller to report.
pub fn resolve_schema(file_name: &str, mapping: Option<&SchemaMapping>) -> SchemaResolution {
    let fallback = |warning| SchemaResolution {
        schema: EntitySchema::Generic,
        warning: Some(warning),
    };
    match mapping {
        None => fallback(SchemaWarning::NoMapping {
            file_name: file_name.to_string(),
        }),
        Some(SchemaMapping::Single(schema)) => SchemaResolution {
            schema: *schema,
            warning: None,
        },
        Some(SchemaMapping::ByFileName(map)) => match map.get(file_name) {
            Some(schema) => SchemaResolution {
                schema: *schema,
                warning: None,
            },
            None => fallback(SchemaWarning::UnmappedFile {
                file_name: file_name.to_string(),
            }),
        },
    }
}

/// Parse a `FILE=SCHEMA` assignment such as `entities-terms.csv=term`.
pub fn parse_schema_assignment(s: &str) -> Result<(String, EntitySchema), CoreError> {
    let (file, schema) = s
        .split_once('=')
        .ok_or_else(|| CoreError::InvalidSchemaAssignment(s.to_string()))?;
    let file = file.trim();
    if file.is_empty() {
        return Err(CoreError::InvalidSchemaAssignment(s.to_string()));
    }
    Ok((file.to_string(), schema.parse()?))
}
