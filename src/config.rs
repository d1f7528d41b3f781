//! TOML configuration parsing and validation.
//!
//! ```toml
//! [store]
//! backend = "sqlite"        # or "file"
//! path = "./data/snipdeck.sqlite"
//!
//! [sync]
//! text_debounce_ms = 1000
//! comment_debounce_ms = 500
//! choice_debounce_ms = 0
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::DebounceDelays;

/// Longest debounce accepted for any field class.
const MAX_DEBOUNCE_MS: u64 = 60_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub path: PathBuf,
}

/// Which persistence backend to use.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Relational storage in a SQLite database.
    #[default]
    Sqlite,
    /// A single JSON document on disk.
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_text_debounce_ms")]
    pub text_debounce_ms: u64,
    #[serde(default = "default_comment_debounce_ms")]
    pub comment_debounce_ms: u64,
    #[serde(default)]
    pub choice_debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            text_debounce_ms: default_text_debounce_ms(),
            comment_debounce_ms: default_comment_debounce_ms(),
            choice_debounce_ms: 0,
        }
    }
}

fn default_text_debounce_ms() -> u64 {
    1000
}
fn default_comment_debounce_ms() -> u64 {
    500
}

impl SyncConfig {
    pub fn delays(&self) -> DebounceDelays {
        DebounceDelays {
            text: Duration::from_millis(self.text_debounce_ms),
            comment: Duration::from_millis(self.comment_debounce_ms),
            choice: Duration::from_millis(self.choice_debounce_ms),
        }
    }
}

impl Config {
    /// Defaults used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                path: PathBuf::from("./data/snipdeck.sqlite"),
            },
            sync: SyncConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.store.path.as_os_str().is_empty() {
        anyhow::bail!("store.path must not be empty");
    }

    for (name, value) in [
        ("sync.text_debounce_ms", config.sync.text_debounce_ms),
        ("sync.comment_debounce_ms", config.sync.comment_debounce_ms),
        ("sync.choice_debounce_ms", config.sync.choice_debounce_ms),
    ] {
        if value > MAX_DEBOUNCE_MS {
            anyhow::bail!("{} must be <= {}", name, MAX_DEBOUNCE_MS);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_sync_defaults() {
        let config = parse(
            r#"
[store]
path = "/tmp/snipdeck.sqlite"
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        let delays = config.sync.delays();
        assert_eq!(delays.text, Duration::from_millis(1000));
        assert_eq!(delays.comment, Duration::from_millis(500));
        assert_eq!(delays.choice, Duration::ZERO);
    }

    #[test]
    fn test_file_backend() {
        let config = parse(
            r#"
[store]
backend = "file"
path = "/tmp/pages.json"

[sync]
text_debounce_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.sync.text_debounce_ms, 250);
        assert_eq!(config.sync.comment_debounce_ms, 500);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(parse(
            r#"
[store]
backend = "postgres"
path = "/tmp/x"
"#
        )
        .is_err());
    }

    #[test]
    fn test_debounce_upper_bound() {
        let err = parse(
            r#"
[store]
path = "/tmp/x"

[sync]
comment_debounce_ms = 120000
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("comment_debounce_ms"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(parse(
            r#"
[store]
path = ""
"#
        )
        .is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/snipdeck.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
