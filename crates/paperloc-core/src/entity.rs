//! Detected entity rows, one struct per schema.
//!
//! Every row carries the common identity columns. Column names follow the
//! files written by the detection stage; `id_` and `tex_path` are accepted as
//! aliases for `id` and `source_path`.

use serde::{Deserialize, Serialize};

use crate::Locatable;
use crate::schema::EntitySchema;

/// Columns every entity file has. Also the whole row for the generic schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityBase {
    #[serde(alias = "id_")]
    pub id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    /// Character offsets of the entity in the source file.
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub tex: String,
    #[serde(default)]
    pub context_tex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(alias = "id_")]
    pub id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub tex: String,
    #[serde(default)]
    pub context_tex: String,
    /// Comma-separated bibitem keys cited together.
    #[serde(default)]
    pub keys: String,
}

impl Citation {
    pub fn keys(&self) -> Vec<&str> {
        self.keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquationEntity {
    #[serde(alias = "id_")]
    pub id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub tex: String,
    #[serde(default)]
    pub context_tex: String,
    /// Index of the equation within its source file.
    #[serde(default)]
    pub i: usize,
    /// TeX between the math delimiters.
    #[serde(default)]
    pub content_tex: String,
    /// Nesting depth; 0 for top-level equations.
    #[serde(default)]
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Term {
    #[serde(alias = "id_")]
    pub id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub tex: String,
    #[serde(default)]
    pub context_tex: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub term_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sentence {
    #[serde(alias = "id_")]
    pub id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub tex: String,
    #[serde(default)]
    pub context_tex: String,
    /// Plain text of the sentence with TeX stripped.
    #[serde(default)]
    pub text: String,
}

/// One detected entity. The variant records which schema its row was read with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectedEntity {
    Generic(EntityBase),
    Citation(Citation),
    Equation(EquationEntity),
    Term(Term),
    Sentence(Sentence),
}

impl DetectedEntity {
    pub fn schema(&self) -> EntitySchema {
        match self {
            Self::Generic(_) => EntitySchema::Generic,
            Self::Citation(_) => EntitySchema::Citation,
            Self::Equation(_) => EntitySchema::Equation,
            Self::Term(_) => EntitySchema::Term,
            Self::Sentence(_) => EntitySchema::Sentence,
        }
    }

    /// Character offsets of the entity in its source file.
    pub fn span(&self) -> (usize, usize) {
        match self {
            Self::Generic(e) => (e.start, e.end),
            Self::Citation(e) => (e.start, e.end),
            Self::Equation(e) => (e.start, e.end),
            Self::Term(e) => (e.start, e.end),
            Self::Sentence(e) => (e.start, e.end),
        }
    }
}

impl Locatable for DetectedEntity {
    fn id(&self) -> &str {
        match self {
            Self::Generic(e) => &e.id,
            Self::Citation(e) => &e.id,
            Self::Equation(e) => &e.id,
            Self::Term(e) => &e.id,
            Self::Sentence(e) => &e.id,
        }
    }

    fn source_path(&self) -> &str {
        match self {
            Self::Generic(e) => &e.source_path,
            Self::Citation(e) => &e.source_path,
            Self::Equation(e) => &e.source_path,
            Self::Term(e) => &e.source_path,
            Self::Sentence(e) => &e.source_path,
        }
    }
}

impl From<EntityBase> for DetectedEntity {
    fn from(e: EntityBase) -> Self {
        Self::Generic(e)
    }
}

impl From<Citation> for DetectedEntity {
    fn from(e: Citation) -> Self {
        Self::Citation(e)
    }
}

impl From<EquationEntity> for DetectedEntity {
    fn from(e: EquationEntity) -> Self {
        Self::Equation(e)
    }
}

impl From<Term> for DetectedEntity {
    fn from(e: Term) -> Self {
        Self::Term(e)
    }
}

impl From<Sentence> for DetectedEntity {
    fn from(e: Sentence) -> Self {
        Self::Sentence(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_across_variants() {
        let term = DetectedEntity::from(Term {
            id: "term-3".into(),
            source_path: "main.tex".into(),
            name: "attention".into(),
            ..Default::default()
        });
        assert_eq!(term.id(), "term-3");
        assert_eq!(term.source_path(), "main.tex");
        assert_eq!(term.schema(), EntitySchema::Term);
    }

    #[test]
    fn test_citation_keys() {
        let citation = Citation {
            keys: "vaswani2017, devlin2019,,".into(),
            ..Default::default()
        };
        assert_eq!(citation.keys(), vec!["vaswani2017", "devlin2019"]);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let entity = DetectedEntity::Generic(EntityBase {
            id: "e1".into(),
            source_path: "p.tex".into(),
            ..Default::default()
        });
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["kind"], "generic");
        assert_eq!(value["id"], "e1");
        assert_eq!(value["source_path"], "p.tex");
    }

    #[test]
    fn test_aliases_accepted() {
        let json = r#"{"id_": "eq-1", "tex_path": "a/b.tex", "i": 4, "content_tex": "x^2"}"#;
        let eq: EquationEntity = serde_json::from_str(json).unwrap();
        assert_eq!(eq.id, "eq-1");
        assert_eq!(eq.source_path, "a/b.tex");
        assert_eq!(eq.i, 4);
        assert_eq!(eq.start, 0);
    }
}
