//! Pipeline settings.
//!
//! Config file lives at `~/.config/codeforge/config.toml` unless a path is
//! given explicitly. Every field is optional in the file; missing values use
//! the defaults below. The API credential is never read from here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::CompletionConfig;
use crate::stages::StageKind;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Attempts per completion call, including the first one.
    pub max_retries: u32,
    /// Length of one backoff unit; attempt `n` waits `2^n` units.
    pub backoff_unit_ms: u64,
    pub timeouts: StageTimeouts,
}

/// Per-call timeout for each stage, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub requirements: u64,
    pub coding: u64,
    pub review: u64,
    pub documentation: u64,
    pub tests: u64,
    pub deployment: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            max_retries: 3,
            backoff_unit_ms: 1000,
            timeouts: StageTimeouts::default(),
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            requirements: 120,
            coding: 120,
            review: 120,
            documentation: 120,
            tests: 180,
            deployment: 120,
        }
    }
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: StageKind) -> Duration {
        let secs = match stage {
            StageKind::Requirements => self.requirements,
            StageKind::Coding => self.coding,
            StageKind::Review => self.review,
            StageKind::Documentation => self.documentation,
            StageKind::Tests => self.tests,
            StageKind::Deployment => self.deployment,
        };
        Duration::from_secs(secs)
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codeforge")
        .join("config.toml")
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist and parse. The default location is
    /// optional: a missing file yields defaults and a bad one is logged.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        match Self::from_file(&path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring bad config file");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Bad config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Completion settings for one stage.
    pub fn completion_config(&self, stage: StageKind) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: self.timeouts.for_stage(stage),
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::from_toml(
            r#"
            model = "claude-haiku"
            max_retries = 5

            [timeouts]
            tests = 300
            "#,
        )
        .unwrap();
        assert_eq!(s.model, "claude-haiku");
        assert_eq!(s.max_retries, 5);
        assert_eq!(s.temperature, 0.7);
        assert_eq!(s.timeouts.tests, 300);
        assert_eq!(s.timeouts.documentation, 120);
    }

    #[test]
    fn test_generation_gets_longer_timeout() {
        let s = Settings::default();
        let tests = s.completion_config(StageKind::Tests);
        let docs = s.completion_config(StageKind::Documentation);
        assert!(tests.timeout > docs.timeout);
        assert_eq!(tests.timeout, Duration::from_secs(180));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Settings::from_toml("max_retries = \"many\"").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = 0.2\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.temperature, 0.2);
    }
}
