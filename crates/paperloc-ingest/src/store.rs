//! Where a paper's identifiers, entities and locations come from.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use paperloc_core::{
    Citation, DetectedEntity, EntityBase, EntitySchema, EquationEntity, HueLocation, Sentence,
    Term,
};

use crate::IngestError;

/// Default glob for entity files inside a paper's detected-entities directory.
pub const DEFAULT_ENTITY_GLOB: &str = "entities*.csv";
const EXTERNAL_ID_DIRKEY: &str = "s2-metadata";
const EXTERNAL_ID_FILE: &str = "s2_id";
const LOCATIONS_FILE: &str = "entity_locations.csv";

/// One file of detected entities for a paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFile {
    /// Bare file name, used for schema lookup.
    pub name: String,
    pub path: PathBuf,
}

impl EntityFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// Source of per-paper data for [`PaperAssembler`](crate::PaperAssembler).
///
/// Absence of optional data is reported as `Ok(None)`; `Err` is reserved for
/// data that exists but can't be read.
pub trait PaperStore {
    /// Papers that have location data, in a stable order.
    fn paper_ids(&self) -> Result<Vec<String>, IngestError>;

    /// The paper's external identifier, or `None` if it was never fetched.
    fn external_id(&self, paper_id: &str) -> Result<Option<String>, IngestError>;

    /// All entity files for the paper, in a stable order.
    fn entity_files(&self, paper_id: &str) -> Result<Vec<EntityFile>, IngestError>;

    fn read_entities(
        &self,
        file: &EntityFile,
        schema: EntitySchema,
    ) -> Result<Vec<DetectedEntity>, IngestError>;

    /// The paper's hue locations, or `None` if no location file exists.
    fn read_locations(&self, paper_id: &str) -> Result<Option<Vec<HueLocation>>, IngestError>;
}

/// arXiv ids may contain `/` (`hep-th/9901001`); on disk it becomes `__`.
pub fn escape_paper_id(paper_id: &str) -> String {
    paper_id.replace('/', "__")
}

pub fn unescape_paper_id(dir_name: &str) -> String {
    dir_name.replace("__", "/")
}

/// Pipeline data directory laid out as one subdirectory per stage and paper:
///
/// ```text
/// <root>/s2-metadata/<paper>/s2_id
/// <root>/detected-<entity>/<paper>/entities*.csv
/// <root>/<entity>-locations/<paper>/entity_locations.csv
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    entity_name: String,
    entity_glob: String,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, entity_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entity_name: entity_name.into(),
            entity_glob: DEFAULT_ENTITY_GLOB.to_string(),
        }
    }

    pub fn with_entity_glob(mut self, glob: impl Into<String>) -> Self {
        self.entity_glob = glob.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn detected_entities_dir(&self, paper_id: &str) -> PathBuf {
        self.root
            .join(format!("detected-{}", self.entity_name))
            .join(escape_paper_id(paper_id))
    }

    pub fn locations_root(&self) -> PathBuf {
        self.root.join(format!("{}-locations", self.entity_name))
    }

    pub fn locations_path(&self, paper_id: &str) -> PathBuf {
        self.locations_root()
            .join(escape_paper_id(paper_id))
            .join(LOCATIONS_FILE)
    }

    pub fn external_id_path(&self, paper_id: &str) -> PathBuf {
        self.root
            .join(EXTERNAL_ID_DIRKEY)
            .join(escape_paper_id(paper_id))
            .join(EXTERNAL_ID_FILE)
    }
}

impl PaperStore for DirectoryStore {
    fn paper_ids(&self) -> Result<Vec<String>, IngestError> {
        let dir = self.locations_root();
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no locations directory");
            return Ok(Vec::new());
        }
        let io_err = |source| IngestError::Io {
            path: dir.clone(),
            source,
        };
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if entry.file_type().map_err(io_err)?.is_dir() {
                ids.push(unescape_paper_id(&entry.file_name().to_string_lossy()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn external_id(&self, paper_id: &str) -> Result<Option<String>, IngestError> {
        let path = self.external_id_path(paper_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        let id = content.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    fn entity_files(&self, paper_id: &str) -> Result<Vec<EntityFile>, IngestError> {
        let dir = self.detected_entities_dir(paper_id);
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            self.entity_glob
        );
        let mut paths = Vec::new();
        for path in glob::glob(&pattern)? {
            let path = path?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths.into_iter().map(EntityFile::new).collect())
    }

    fn read_entities(
        &self,
        file: &EntityFile,
        schema: EntitySchema,
    ) -> Result<Vec<DetectedEntity>, IngestError> {
        let path = file.path.as_path();
        match schema {
            EntitySchema::Generic => read_rows::<EntityBase>(path),
            EntitySchema::Citation => read_rows::<Citation>(path),
            EntitySchema::Equation => read_rows::<EquationEntity>(path),
            EntitySchema::Term => read_rows::<Term>(path),
            EntitySchema::Sentence => read_rows::<Sentence>(path),
        }
    }

    fn read_locations(&self, paper_id: &str) -> Result<Option<Vec<HueLocation>>, IngestError> {
        let path = self.locations_path(paper_id);
        if !path.exists() {
            return Ok(None);
        }
        read_csv::<HueLocation>(&path).map(Some)
    }
}

fn read_rows<T>(path: &Path) -> Result<Vec<DetectedEntity>, IngestError>
where
    T: DeserializeOwned + Into<DetectedEntity>,
{
    Ok(read_csv::<T>(path)?.into_iter().map(Into::into).collect())
}

/// Read a headed CSV file into rows. Columns not named by `T` are ignored.
fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let csv_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_err)?;
    reader
        .deserialize::<T>()
        .map(|row| row.map_err(csv_err))
        .collect()
}
