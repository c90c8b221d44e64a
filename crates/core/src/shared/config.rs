use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::DEFAULT_NSFW_RATE_THRESHOLD;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Whether frame and video verdicts consult the detector.
///
/// `Disabled` reports every frame and video as safe without running
/// inference; [`detect_nsfw`](crate::analysis::content_analyser::ContentAnalyser::detect_nsfw)
/// stays callable either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentPolicy {
    #[default]
    Disabled,
    Enforced,
}

impl std::fmt::Display for ContentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentPolicy::Disabled => write!(f, "disabled"),
            ContentPolicy::Enforced => write!(f, "enforced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyserConfig {
    #[serde(default)]
    pub policy: ContentPolicy,
    /// Upper bound on concurrent inference calls. `None` leaves it unbounded.
    #[serde(default)]
    pub execution_thread_count: Option<usize>,
    #[serde(default = "default_nsfw_rate_threshold")]
    pub nsfw_rate_threshold: f64,
}

fn default_nsfw_rate_threshold() -> f64 {
    DEFAULT_NSFW_RATE_THRESHOLD
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            policy: ContentPolicy::default(),
            execution_thread_count: None,
            nsfw_rate_threshold: default_nsfw_rate_threshold(),
        }
    }
}

impl AnalyserConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled_and_unbounded() {
        let config = AnalyserConfig::default();
        assert_eq!(config.policy, ContentPolicy::Disabled);
        assert_eq!(config.execution_thread_count, None);
        assert_eq!(config.nsfw_rate_threshold, 10.0);
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "policy": "enforced" }"#).unwrap();

        let config = AnalyserConfig::load(&path).unwrap();

        assert_eq!(config.policy, ContentPolicy::Enforced);
        assert_eq!(config.execution_thread_count, None);
        assert_eq!(config.nsfw_rate_threshold, 10.0);
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "policy": "disabled", "execution_thread_count": 4, "nsfw_rate_threshold": 25.0 }"#,
        )
        .unwrap();

        let config = AnalyserConfig::load(&path).unwrap();

        assert_eq!(config.execution_thread_count, Some(4));
        assert_eq!(config.nsfw_rate_threshold, 25.0);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = AnalyserConfig::load(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "policy": "sometimes" }"#).unwrap();

        let result = AnalyserConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(ContentPolicy::Enforced.to_string(), "enforced");
        assert_eq!(ContentPolicy::Disabled.to_string(), "disabled");
    }
}
