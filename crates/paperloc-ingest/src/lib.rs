use std::path::PathBuf;

use thiserror::Error;

pub mod assemble;
pub mod store;

pub use assemble::{Diagnostic, PaperAssembler, PaperOutcome};
pub use store::{DirectoryStore, EntityFile, PaperStore, escape_paper_id, unescape_paper_id};
// Re-export domain types for convenience
pub use paperloc_core::{
    DetectedEntity, EntitySchema, HueLocation, LocalizedEntity, PaperResult, SchemaMapping,
};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid entity file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list entity files: {0}")]
    Glob(#[from] glob::GlobError),
}
