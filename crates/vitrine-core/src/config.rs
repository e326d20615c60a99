//! Persisted config (catalog path, index directory, model) in the app data directory,
//! and the resolved [`Settings`] the recommender is built from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBED_MODEL};

const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_DATA_PATH: &str = "data/products.csv";

pub const ENV_DATA_PATH: &str = "VITRINE_DATA_PATH";
pub const ENV_INDEX_DIR: &str = "VITRINE_INDEX_DIR";
pub const ENV_EMBEDDING_MODEL: &str = "VITRINE_EMBEDDING_MODEL";
pub const ENV_OLLAMA_URL: &str = "VITRINE_OLLAMA_URL";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the product catalog CSV.
    pub data_path: Option<String>,
    /// Directory holding the cached embeddings and index.
    pub index_dir: Option<String>,
    /// Embedding model name as known to Ollama.
    pub embedding_model: Option<String>,
    pub ollama_url: Option<String>,
}

/// Everything needed to open a recommender.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub index_dir: PathBuf,
    pub embedding_model: String,
    pub ollama_url: String,
}

impl Settings {
    /// Resolve from the environment, then the config file, then defaults.
    pub fn resolve() -> Self {
        Self::from_sources(&load_config(), |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit config and environment lookup.
    pub fn from_sources(config: &Config, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |key: &str, configured: &Option<String>| {
            env(key)
                .filter(|s| !s.is_empty())
                .or_else(|| configured.clone().filter(|s| !s.is_empty()))
        };
        Self {
            data_path: pick(ENV_DATA_PATH, &config.data_path)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            index_dir: pick(ENV_INDEX_DIR, &config.index_dir)
                .map(PathBuf::from)
                .unwrap_or_else(app_data::default_index_dir),
            embedding_model: pick(ENV_EMBEDDING_MODEL, &config.embedding_model)
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            ollama_url: pick(ENV_OLLAMA_URL, &config.ollama_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    let path = data_dir.join(CONFIG_FILENAME);
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    toml::from_str(&s).unwrap_or_default()
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = data_dir.join(CONFIG_FILENAME);
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, s).map_err(ConfigError::Write)
}

/// Set and persist the catalog path.
pub fn set_data_path(path: &Path) -> Result<(), ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path));
    }
    let mut config = load_config();
    config.data_path = Some(path.to_string_lossy().into_owned());
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = Settings::from_sources(&Config::default(), |_| None);
        assert_eq!(s.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(s.embedding_model, DEFAULT_EMBED_MODEL);
        assert_eq!(s.ollama_url, DEFAULT_BASE_URL);
        assert!(s.index_dir.ends_with("vectorstore"));
    }

    #[test]
    fn env_beats_config() {
        let config = Config {
            data_path: Some("from-config.csv".into()),
            embedding_model: Some("nomic-embed-text".into()),
            ..Config::default()
        };
        let env: HashMap<&str, &str> = [(ENV_DATA_PATH, "from-env.csv"), (ENV_INDEX_DIR, "")].into();
        let s = Settings::from_sources(&config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.data_path, PathBuf::from("from-env.csv"));
        assert_eq!(s.embedding_model, "nomic-embed-text");
        assert!(s.index_dir.ends_with("vectorstore"));
    }

    #[test]
    fn config_parses_from_toml() {
        let config: Config = toml::from_str("data_path = \"catalog.csv\"\nollama_url = \"http://gpu:11434\"\n").unwrap();
        assert_eq!(config.data_path.as_deref(), Some("catalog.csv"));
        assert_eq!(config.ollama_url.as_deref(), Some("http://gpu:11434"));
        assert_eq!(config.index_dir, None);
    }

    #[test]
    fn set_data_path_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(set_data_path(dir.path()), Err(ConfigError::NotAFile(_))));
    }
}
