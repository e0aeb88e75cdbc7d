//! oasplit configuration (`oasplit.toml`) and configuration errors

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "oasplit.toml";

/// Missing or unreadable inputs that must be fixed before a run can start
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{what} not found at {path:?}")]
    Missing { what: &'static str, path: PathBuf },

    #[error("failed to read {what} at {path:?}: {source}")]
    Unreadable {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {what} at {path:?}: {message}")]
    Malformed {
        what: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl ConfigurationError {
    /// Read a required file, mapping the I/O failure to a configuration error
    pub fn read_required(what: &'static str, path: &Path) -> Result<String, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::Missing {
                what,
                path: path.to_path_buf(),
            });
        }
        std::fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            what,
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn malformed(what: &'static str, path: &Path, message: impl ToString) -> Self {
        ConfigurationError::Malformed {
            what,
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Serialization format of generated documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// oasplit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OasplitConfig {
    /// Environments a split can target
    #[serde(default = "default_environments")]
    pub environments: Vec<String>,

    /// Where split documents are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File name prefix of split documents (`<prefix>-<version>.<ext>`)
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Breaking change exemption list
    #[serde(default)]
    pub exemptions_path: Option<PathBuf>,

    /// Directory holding changelog.json and metadata.json
    #[serde(default = "default_changelog_dir")]
    pub changelog_dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,
}

fn default_environments() -> Vec<String> {
    vec![
        "dev".to_string(),
        "qa".to_string(),
        "stage".to_string(),
        "prod".to_string(),
    ]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_file_prefix() -> String {
    "openapi".to_string()
}

fn default_changelog_dir() -> PathBuf {
    PathBuf::from("changelog")
}

impl Default for OasplitConfig {
    fn default() -> Self {
        Self {
            environments: default_environments(),
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            exemptions_path: None,
            changelog_dir: default_changelog_dir(),
            format: OutputFormat::default(),
        }
    }
}

impl OasplitConfig {
    /// Load config from `oasplit.toml` under `project_root`, defaults if absent
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = ConfigurationError::read_required("configuration", &config_path)?;
        let config: OasplitConfig = toml::from_str(&content)
            .map_err(|e| ConfigurationError::malformed("configuration", &config_path, e))?;
        Ok(config)
    }

    /// Check that `env` is one of the configured environments
    pub fn validate_env(&self, env: &str) -> anyhow::Result<()> {
        if self.environments.iter().any(|e| e == env) {
            Ok(())
        } else {
            anyhow::bail!(
                "Unknown environment '{}', expected one of: {}",
                env,
                self.environments.join(", ")
            )
        }
    }

    /// Output path of a split document
    pub fn split_file_name(&self, version: &str) -> String {
        format!("{}-{}.{}", self.file_prefix, version, self.format.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = OasplitConfig::load(dir.path()).unwrap();
        assert_eq!(config.environments, vec!["dev", "qa", "stage", "prod"]);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.split_file_name("2023-01-01"), "openapi-2023-01-01.json");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "environments = [\"dev\", \"prod\"]\nformat = \"yaml\"\nexemptions_path = \"exemptions.yaml\"\n",
        )
        .unwrap();

        let config = OasplitConfig::load(dir.path()).unwrap();
        assert_eq!(config.environments, vec!["dev", "prod"]);
        assert_eq!(config.format, OutputFormat::Yaml);
        assert_eq!(config.exemptions_path, Some(PathBuf::from("exemptions.yaml")));
        assert_eq!(config.file_prefix, "openapi");
        assert!(config.validate_env("prod").is_ok());
        assert!(config.validate_env("qa").is_err());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "environments = 3").unwrap();
        let err = OasplitConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse configuration"));
    }
}
