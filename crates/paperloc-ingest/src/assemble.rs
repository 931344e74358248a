use thiserror::Error;

use paperloc_core::{PaperResult, SchemaMapping, SchemaWarning, join, resolve_schema};

use crate::IngestError;
use crate::store::PaperStore;

/// A data gap that was worked around while assembling a paper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("could not find external id for {paper_id}; skipping")]
    MissingIdentifier { paper_id: String },
    #[error("{paper_id}: {warning}")]
    UnresolvedSchema {
        paper_id: String,
        warning: SchemaWarning,
    },
    #[error("no entity locations for {paper_id}; all entities are unlocated")]
    MissingLocations { paper_id: String },
}

/// What happened to one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOutcome {
    pub paper_id: String,
    /// `None` when the paper was skipped.
    pub result: Option<PaperResult>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PaperOutcome {
    pub fn is_skipped(&self) -> bool {
        self.result.is_none()
    }
}

/// Builds [`PaperResult`]s by pairing each paper's entities with their locations.
pub struct PaperAssembler<S> {
    store: S,
    schemas: Option<SchemaMapping>,
}

impl<S: PaperStore> PaperAssembler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            schemas: None,
        }
    }

    /// Schema mapping used to pick a row layout per entity file.
    pub fn with_schemas(mut self, schemas: Option<SchemaMapping>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load and join one paper.
    ///
    /// A missing external id skips the paper; unmapped entity files and a
    /// missing location file degrade to generic rows and empty location lists.
    /// Each of these is logged and returned as a [`Diagnostic`].
    pub fn assemble(&self, paper_id: &str) -> Result<PaperOutcome, IngestError> {
        let Some(external_id) = self.store.external_id(paper_id)? else {
            tracing::warn!(paper_id, "could not find external id; skipping");
            return Ok(PaperOutcome {
                paper_id: paper_id.to_string(),
                result: None,
                diagnostics: vec![Diagnostic::MissingIdentifier {
                    paper_id: paper_id.to_string(),
                }],
            });
        };

        let mut diagnostics = Vec::new();
        let mut entities = Vec::new();
        for file in self.store.entity_files(paper_id)? {
            let resolution = resolve_schema(&file.name, self.schemas.as_ref());
            if let Some(warning) = resolution.warning {
                tracing::warn!(paper_id, file = %file.name, "{warning}");
                diagnostics.push(Diagnostic::UnresolvedSchema {
                    paper_id: paper_id.to_string(),
                    warning,
                });
            }
            let rows = self.store.read_entities(&file, resolution.schema)?;
            tracing::debug!(
                paper_id,
                file = %file.name,
                schema = %resolution.schema,
                rows = rows.len(),
                "loaded entities"
            );
            entities.extend(rows);
        }

        let locations = match self.store.read_locations(paper_id)? {
            Some(locations) => locations,
            None => {
                tracing::warn!(paper_id, "no entity locations file");
                diagnostics.push(Diagnostic::MissingLocations {
                    paper_id: paper_id.to_string(),
                });
                Vec::new()
            }
        };

        let localized_entities = join(entities, &locations);
        tracing::debug!(
            paper_id,
            entities = localized_entities.len(),
            locations = locations.len(),
            "joined entities with locations"
        );

        Ok(PaperOutcome {
            paper_id: paper_id.to_string(),
            result: Some(PaperResult {
                paper_id: paper_id.to_string(),
                external_id,
                localized_entities,
            }),
            diagnostics,
        })
    }

    /// Assemble papers one after another. A failure on one paper is yielded
    /// in its place and does not stop the rest.
    pub fn assemble_all<'a, I>(
        &'a self,
        paper_ids: I,
    ) -> impl Iterator<Item = Result<PaperOutcome, IngestError>> + 'a
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        paper_ids.into_iter().map(move |id| self.assemble(&id))
    }
}
