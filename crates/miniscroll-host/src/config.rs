use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("IO error reading config: {0}")]
    IoError(#[from] std::io::Error),
}

/// What the dispatcher does when a wrapper callback fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure (errors and panics) and carry on with the next
    /// instance
    #[default]
    Isolate,
    /// Return the first failure to the engine, skipping the remaining
    /// instances for that event
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Trigger event fired on an object when one of its input actions
    /// activates (default: "Input")
    #[serde(default = "default_input")]
    pub input_trigger: String,

    /// Config key naming an object's input set (default: "Input")
    #[serde(default = "default_input")]
    pub input_key: String,
}

fn default_input() -> String {
    "Input".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            input_trigger: default_input(),
            input_key: default_input(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the data directory
    #[serde(default)]
    pub file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiniscrollConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MiniscrollConfig {
    /// `config.toml` in the platform config directory, when a home directory
    /// can be found
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!(target: "miniscroll", "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!(target: "miniscroll", "Saved config to {}", path.display());
        Ok(())
    }
}

/// Platform directories for miniscroll (config, data, logs)
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "orx", "miniscroll")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MiniscrollConfig::parse("").unwrap();
        assert_eq!(config, MiniscrollConfig::default());
        assert_eq!(config.dispatch.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.dispatch.input_trigger, "Input");
    }

    #[test]
    fn test_parse_dispatch_section() {
        let config = MiniscrollConfig::parse(
            r#"
[dispatch]
failure_policy = "propagate"
input_trigger = "Action"

[logging]
file = true
"#,
        )
        .unwrap();

        assert_eq!(config.dispatch.failure_policy, FailurePolicy::Propagate);
        assert_eq!(config.dispatch.input_trigger, "Action");
        assert_eq!(config.dispatch.input_key, "Input");
        assert!(config.logging.file);
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = MiniscrollConfig::parse("[dispatch]\nfailure_policy = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::ParseError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MiniscrollConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigLoadError::NotFound(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MiniscrollConfig::default();
        config.dispatch.failure_policy = FailurePolicy::Propagate;
        config.save(&path).unwrap();

        assert_eq!(MiniscrollConfig::load(&path).unwrap(), config);
    }
}
