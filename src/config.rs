//! Process configuration loaded from TOML.
//!
//! Every field has a default, so a missing file yields a usable
//! configuration. The expansion provider key may also come from the
//! [`API_KEY_ENV`] environment variable, which wins over the file.

use crate::run::adapters::{
    chat_expander::ChatExpanderSettings, command_pipeline::CommandPipelineSettings,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{io::ErrorKind, time::Duration};
use thiserror::Error;

/// Environment variable overriding `expander.api_key`.
pub const API_KEY_ENV: &str = "TRENDWATCH_AI_API_KEY";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Task store settings.
    pub storage: StorageConfig,
    /// Shared documents rewritten during runs.
    pub resources: ResourceConfig,
    /// Keyword expansion provider.
    pub expander: ExpanderConfig,
    /// Report pipeline command.
    pub pipeline: PipelineConfig,
    /// Persisted result sets for link-list runs.
    pub results: ResultsConfig,
    /// Execution history presentation.
    pub history: HistoryConfig,
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database file.
    pub database_path: Utf8PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: Utf8PathBuf::from("output/tasks.db"),
        }
    }
}

/// `[resources]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Directory holding both shared documents.
    pub config_dir: Utf8PathBuf,
    /// Keyword/filter document name.
    pub filter_file: String,
    /// Settings document name.
    pub settings_file: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            config_dir: Utf8PathBuf::from("config"),
            filter_file: "frequency_words.txt".to_owned(),
            settings_file: "config.toml".to_owned(),
        }
    }
}

/// `[expander]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    /// Whether runs may consult the provider at all.
    pub enabled: bool,
    /// API root.
    pub api_base: String,
    /// Model name.
    pub model: String,
    /// Bearer token.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key: String::new(),
            timeout_secs: 60,
            temperature: 0.3,
        }
    }
}

impl ExpanderConfig {
    /// Builds adapter settings.
    #[must_use]
    pub fn chat_settings(&self) -> ChatExpanderSettings {
        ChatExpanderSettings {
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            temperature: self.temperature,
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Program to execute.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub working_dir: Utf8PathBuf,
    /// Output directory relative to the working directory.
    pub output_dir: Utf8PathBuf,
    /// Standard output marker preceding the artifact path.
    pub artifact_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_owned(),
            args: vec!["-m".to_owned(), "trendradar".to_owned()],
            working_dir: Utf8PathBuf::from("."),
            output_dir: Utf8PathBuf::from("output"),
            artifact_marker: "HTML report generated:".to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Builds adapter settings.
    #[must_use]
    pub fn command_settings(&self) -> CommandPipelineSettings {
        CommandPipelineSettings {
            program: self.program.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            output_dir: self.output_dir.clone(),
            artifact_marker: self.artifact_marker.clone(),
        }
    }
}

/// `[results]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Directory holding `ranked.json` and `feed.json`.
    pub snapshot_dir: Utf8PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: Utf8PathBuf::from("output/latest"),
        }
    }
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Executions returned alongside a task.
    pub recent_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { recent_limit: 5 }
    }
}

impl WatchConfig {
    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown sections.
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(path, &text)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        config.apply_env_overrides(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Replaces the provider key with a non-blank `api_key`.
    pub fn apply_env_overrides(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.expander.api_key = key;
        }
    }
}
