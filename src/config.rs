//! Engine configuration, read from YAML.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes, and a missing file is the same as an empty one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prepend a `system.parser` event describing the parse to each turn.
    pub debug_parser_events: bool,
    /// Add a `system.validation` event listing resolved ids and their scope.
    pub debug_validation_events: bool,
    /// Lexicon file tried before the embedded one.
    pub lexicon_path: Option<PathBuf>,
    /// Actor commands are issued for when the host does not say.
    pub default_actor: Option<EntityId>,
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}
