//! Serializable pipeline configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a full pipeline run.
///
/// Loaded from a TOML file; every field except the transcript source has a
/// default, so a minimal config is just a `[source]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Where transcripts come from.
    pub source: TranscriptSourceConfig,

    /// Directory for the close cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Root directory for the exported dataset.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Days added on both sides of the event-date range when fetching closes.
    #[serde(default = "default_buffer_days")]
    pub buffer_days: i64,

    /// Never make network requests for prices; use the cache only.
    #[serde(default)]
    pub offline: bool,

    /// Re-download closes even when the cache covers the range.
    #[serde(default)]
    pub force: bool,
}

/// Transcript source selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptSourceConfig {
    /// Hugging Face datasets-server rows API.
    HuggingFace {
        /// Dataset id, e.g. "glopardo/sp500-earnings-transcripts".
        dataset: String,
        #[serde(default = "default_hf_config")]
        config: String,
        #[serde(default = "default_split")]
        split: String,
    },

    /// Local JSONL dump (one row object per line).
    Jsonl { path: PathBuf },
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_buffer_days() -> i64 {
    5
}

fn default_hf_config() -> String {
    "default".into()
}

fn default_split() -> String {
    "train".into()
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid pipeline config")
    }
}
