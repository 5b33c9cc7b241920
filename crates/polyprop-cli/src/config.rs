//! CLI configuration management.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file, `.env`,
//! `POLYPROP_*` environment variables, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use polyprop_describe::{Backend, GeneratorConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the model artifacts.
    pub model_dir: PathBuf,

    /// JSON-lines file backing the description cache.
    pub cache_path: PathBuf,

    /// Reference dataset served by `/random-sample`.
    pub dataset: Option<PathBuf>,

    /// Port the HTTP service listens on.
    pub port: u16,

    /// Generator wire protocol.
    pub llm_backend: Backend,

    /// Generator base URL.
    pub llm_url: String,

    /// Generator model name.
    pub llm_model: String,

    /// Bearer token for the generator endpoint.
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,

    /// Pause between replayed cache chunks, in milliseconds.
    pub replay_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let cache_path = ProjectDirs::from("dev", "polyprop", "polyprop")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("polyprop"))
            .join("descriptions.jsonl");

        Self {
            model_dir: PathBuf::from("models"),
            cache_path,
            dataset: Some(PathBuf::from("data/dataset.csv")),
            port: 5000,
            llm_backend: Backend::default(),
            llm_url: DEFAULT_BASE_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_api_key: None,
            replay_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from the config file, `.env` and environment.
    ///
    /// `config_file` overrides the platform config path.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let path = config_file
            .map(Path::to_path_buf)
            .or_else(Self::config_file_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => Self::default(),
        };

        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Parse a config file; absent keys keep their defaults.
    pub fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Override fields from `POLYPROP_*` variables as returned by `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("POLYPROP_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("POLYPROP_CACHE_PATH") {
            self.cache_path = PathBuf::from(path);
        }
        if let Some(path) = var("POLYPROP_DATASET") {
            self.dataset = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(port) = var("POLYPROP_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("Invalid POLYPROP_PORT: {port}"))?;
        }
        if let Some(backend) = var("POLYPROP_LLM_BACKEND") {
            self.llm_backend = backend.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(url) = var("POLYPROP_LLM_URL") {
            self.llm_url = url;
        }
        if let Some(model) = var("POLYPROP_LLM_MODEL") {
            self.llm_model = model;
        }
        if let Some(key) = var("POLYPROP_LLM_API_KEY") {
            self.llm_api_key = Some(key);
        }
        if let Some(delay) = var("POLYPROP_REPLAY_DELAY_MS") {
            self.replay_delay_ms = delay
                .parse()
                .with_context(|| format!("Invalid POLYPROP_REPLAY_DELAY_MS: {delay}"))?;
        }
        Ok(())
    }

    /// Save configuration to `path`, or the platform config file.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(Self::config_file_path)
            .context("No config file path available on this platform")?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        Ok(config_path)
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "polyprop", "polyprop")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            backend: self.llm_backend,
            base_url: self.llm_url.clone(),
            model: self.llm_model.clone(),
            api_key: self.llm_api_key.clone(),
            ..GeneratorConfig::default()
        }
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("POLYPROP_MODEL_DIR", "/srv/models"),
                ("POLYPROP_PORT", "8080"),
                ("POLYPROP_LLM_BACKEND", "openai"),
                ("POLYPROP_LLM_MODEL", "gpt-4o-mini"),
                ("POLYPROP_REPLAY_DELAY_MS", "0"),
                ("POLYPROP_DATASET", ""),
            ]))
            .unwrap();

        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.llm_backend, Backend::OpenAi);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.replay_delay(), Duration::ZERO);
        assert_eq!(config.dataset, None);
        assert_eq!(config.llm_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_env_values_are_errors() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("POLYPROP_PORT", "http")])).is_err());
        assert!(config
            .apply_env(env(&[("POLYPROP_LLM_BACKEND", "bard")]))
            .is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"port": 9000, "llm_backend": "openai"}"#).unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.llm_backend, Backend::OpenAi);
        assert_eq!(config.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn save_round_trips_without_api_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.json");
        let config = Config {
            llm_api_key: Some("sk-secret".to_string()),
            port: 7000,
            ..Config::default()
        };

        let written = config.save(Some(&path)).unwrap();
        assert_eq!(written, path);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("sk-secret"));

        let loaded = Config::read_file(&path).unwrap();
        assert_eq!(loaded.port, 7000);
        assert_eq!(loaded.llm_api_key, None);
    }

    #[test]
    fn generator_config_carries_llm_settings() {
        let config = Config {
            llm_api_key: Some("key".to_string()),
            ..Config::default()
        };
        let generator = config.generator_config();
        assert_eq!(generator.model, DEFAULT_MODEL);
        assert_eq!(generator.api_key.as_deref(), Some("key"));
    }
}
