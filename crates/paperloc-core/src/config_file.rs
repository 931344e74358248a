use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::schema::{EntitySchema, SchemaMapping};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data: Option<DataConfig>,
    pub bibliography: Option<BibliographyConfig>,
    /// Entity file name to schema name, e.g. `"entities-terms.csv" = "term"`.
    pub schemas: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root of the per-stage data directories.
    pub root: Option<String>,
    /// Glob (relative to a paper's detected-entities directory) matching entity files.
    pub entity_glob: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BibliographyConfig {
    /// Command names that start a bibliography entry.
    pub markers: Option<Vec<String>>,
}

impl ConfigFile {
    /// The configured schema mapping, or `None` when no `[schemas]` table is set.
    pub fn schema_mapping(&self) -> Result<Option<SchemaMapping>, CoreError> {
        let Some(schemas) = &self.schemas else {
            return Ok(None);
        };
        let map = schemas
            .iter()
            .map(|(file, name)| Ok((file.clone(), name.parse::<EntitySchema>()?)))
            .collect::<Result<BTreeMap<_, _>, CoreError>>()?;
        Ok(Some(SchemaMapping::ByFileName(map)))
    }
}

/// Platform config directory path: `<config_dir>/paperloc/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paperloc").join("config.toml"))
}

/// Load config by cascading CWD `.paperloc.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".paperloc.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
/// Schema tables merge per file name.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let schemas = match (base.schemas, overlay.schemas) {
        (None, None) => None,
        (Some(b), None) => Some(b),
        (None, Some(o)) => Some(o),
        (Some(mut b), Some(o)) => {
            b.extend(o);
            Some(b)
        }
    };

    ConfigFile {
        data: Some(DataConfig {
            root: overlay
                .data
                .as_ref()
                .and_then(|d| d.root.clone())
                .or_else(|| base.data.as_ref().and_then(|d| d.root.clone())),
            entity_glob: overlay
                .data
                .as_ref()
                .and_then(|d| d.entity_glob.clone())
                .or_else(|| base.data.as_ref().and_then(|d| d.entity_glob.clone())),
        }),
        bibliography: Some(BibliographyConfig {
            markers: overlay
                .bibliography
                .as_ref()
                .and_then(|b| b.markers.clone())
                .or_else(|| base.bibliography.as_ref().and_then(|b| b.markers.clone())),
        }),
        schemas,
    }
}
