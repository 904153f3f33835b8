//! Analyzer configuration
//!
//! Settings can be built in code, or loaded from a TOML file with an
//! `[analyzer]` section. Every field has a default, so an empty file is valid.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest gap (seconds) between two sightings of the same visit
pub const DEFAULT_VISIT_GAP_SECS: u64 = 15 * 60;

/// How "most frequent" resolves equal counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The key seen first in the input wins
    #[default]
    FirstSeen,
    /// The smallest key wins
    Lexicographic,
}

/// What to do with a malformed sighting record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecordPolicy {
    /// Fail the whole batch on the first invalid record
    #[default]
    RejectBatch,
    /// Drop invalid records and analyze the rest
    SkipInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_visit_gap_secs")]
    pub visit_gap_secs: u64,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default)]
    pub invalid_records: InvalidRecordPolicy,
}

fn default_visit_gap_secs() -> u64 {
    DEFAULT_VISIT_GAP_SECS
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            visit_gap_secs: DEFAULT_VISIT_GAP_SECS,
            tie_break: TieBreak::default(),
            invalid_records: InvalidRecordPolicy::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_visit_gap_secs(mut self, secs: u64) -> Self {
        self.visit_gap_secs = secs;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_invalid_records(mut self, policy: InvalidRecordPolicy) -> Self {
        self.invalid_records = policy;
        self
    }

    /// Visit gap threshold, saturating at the largest representable duration
    pub fn visit_gap(&self) -> Duration {
        i64::try_from(self.visit_gap_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    analyzer: AnalyzerConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_from_str(contents: &str) -> Result<AnalyzerConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(contents)?;
    Ok(file.analyzer)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<AnalyzerConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}
