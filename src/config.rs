//! Application configuration.
//!
//! Loaded from an optional JSON file; any field left out takes its default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::GrammarSource;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Config file is not valid JSON for [`AppConfig`]
    #[error("invalid config {path}: {source}")]
    Json {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Text generation endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the Ollama-compatible server
    pub endpoint: String,
    /// Model name passed with every request
    pub model: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Configuration for the engine and its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `<domain>.pest` grammars (default: bundled grammars)
    pub grammar_dir: Option<PathBuf>,

    /// Conference state file
    pub state_path: PathBuf,

    /// Text generation settings
    pub generator: GeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grammar_dir: None,
            state_path: PathBuf::from("conference_state.json"),
            generator: GeneratorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Where grammars come from under this configuration.
    pub fn grammar_source(&self) -> GrammarSource {
        match &self.grammar_dir {
            Some(dir) => GrammarSource::Directory(dir.clone()),
            None => GrammarSource::Bundled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_config_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tally.json");
        fs::write(&path, r#"{"generator": {"model": "mistral"}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.generator.model, "mistral");
        assert_eq!(config.generator.endpoint, "http://localhost:11434");
        assert_eq!(config.state_path, PathBuf::from("conference_state.json"));
        assert_eq!(config.grammar_source(), GrammarSource::Bundled);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Path::new("/nonexistent/tally.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn grammar_dir_selects_directory_source() {
        let config = AppConfig {
            grammar_dir: Some(PathBuf::from("grammars")),
            ..AppConfig::default()
        };
        assert_eq!(config.grammar_source(), GrammarSource::Directory(PathBuf::from("grammars")));
    }
}
