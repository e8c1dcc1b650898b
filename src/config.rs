use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::rag::classify::{
    DEFAULT_COMPARISON_DAYS, DEFAULT_PATTERN_DAYS, DEFAULT_REVIEW_DAYS,
};
use crate::pipeline::rag::generate::RetryPolicy;
use crate::pipeline::rag::ollama::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::pipeline::rag::orchestrator::{ChatConfig, DEFAULT_HISTORY_WINDOW};
use crate::pipeline::rag::retrieval::{DEFAULT_RELEVANCE_THRESHOLD, DEFAULT_TOP_N};

/// Application-level constants
pub const APP_NAME: &str = "Cadence";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const OLLAMA_URL_ENV: &str = "CADENCE_OLLAMA_URL";
pub const MODEL_ENV: &str = "CADENCE_MODEL";

/// ~/Cadence/ on all platforms. Falls back to the temp directory when no
/// home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Per-user session memory files.
pub fn sessions_dir() -> PathBuf {
    app_data_dir().join("sessions")
}

pub fn database_path() -> PathBuf {
    app_data_dir().join("cadence.db")
}

pub fn config_path() -> PathBuf {
    app_data_dir().join("config.json")
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "cadence_lib=debug,warn"
    } else {
        "cadence_lib=info,warn"
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User-editable settings, stored as JSON. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    pub review_days: u32,
    pub pattern_days: u32,
    pub comparison_days: u32,
    pub evidence_top_n: usize,
    pub relevance_threshold: u32,
    pub history_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            review_days: DEFAULT_REVIEW_DAYS,
            pattern_days: DEFAULT_PATTERN_DAYS,
            comparison_days: DEFAULT_COMPARISON_DAYS,
            evidence_top_n: DEFAULT_TOP_N,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl AppConfig {
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            evidence_top_n: self.evidence_top_n,
            relevance_threshold: self.relevance_threshold,
            history_window: self.history_window,
            review_days: self.review_days,
            pattern_days: self.pattern_days,
            comparison_days: self.comparison_days,
            retry: self.retry,
        }
    }

    /// Apply `CADENCE_OLLAMA_URL` / `CADENCE_MODEL` from `lookup`. Blank
    /// values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(OLLAMA_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(env = OLLAMA_URL_ENV, "Ollama URL overridden from environment");
            self.ollama_url = url.trim().to_string();
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(env = MODEL_ENV, model = %model.trim(), "Model overridden from environment");
            self.model = model.trim().to_string();
        }
    }
}

/// Missing file → defaults; malformed file → error. Environment overrides
/// are applied last.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = read_config_file(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("Cadence"));
    }

    #[test]
    fn data_paths_under_app_data() {
        let app = app_data_dir();
        assert!(sessions_dir().starts_with(&app));
        assert!(database_path().starts_with(&app));
        assert!(config_path().ends_with("config.json"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn defaults() {
        let c = AppConfig::default();
        assert_eq!(c.ollama_url, "http://localhost:11434");
        assert_eq!(c.model, "medgemma");
        assert_eq!(c.request_timeout_secs, 300);
        assert_eq!(c.retry.max_attempts, 3);
        assert_eq!((c.review_days, c.pattern_days, c.comparison_days), (3, 7, 7));
        assert_eq!((c.evidence_top_n, c.relevance_threshold, c.history_window), (8, 2, 4));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "model": "llama3:8b", "retry": { "max_attempts": 5 } }"#).unwrap();

        let config = read_config_file(&path).unwrap();
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.review_days, 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_config_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            history_window: 6,
            ..AppConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(read_config_file(&path).unwrap(), config);
    }

    #[test]
    fn env_overrides_apply_and_ignore_blanks() {
        let env: HashMap<&str, &str> =
            HashMap::from([(OLLAMA_URL_ENV, " http://127.0.0.1:9999 "), (MODEL_ENV, "  ")]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.ollama_url, "http://127.0.0.1:9999");
        assert_eq!(config.model, "medgemma");
    }

    #[test]
    fn chat_config_mirrors_settings() {
        let config = AppConfig {
            evidence_top_n: 3,
            review_days: 5,
            ..AppConfig::default()
        };
        let chat = config.chat_config();
        assert_eq!(chat.evidence_top_n, 3);
        assert_eq!(chat.review_days, 5);
        assert_eq!(chat.retry, config.retry);
    }
}
