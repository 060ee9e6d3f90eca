use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::TaggerError;
use crate::models::region::Region;

/// Top-level tagger configuration, stored at `~/.branchtag/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// Scan-platform region.
    #[serde(default)]
    pub region: Region,

    /// Value of the `version` query parameter on scan-platform calls.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Page-size ceiling for paginated listings.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Accepted values for the target source-type filter.
    #[serde(default = "default_source_types")]
    pub allowed_source_types: Vec<String>,

    /// Hosting-platform API root. Point at `https://host/api/v3` for enterprise.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: Url,

    /// Literal host marker used to split hosted repository URLs.
    #[serde(default = "default_host_marker")]
    pub github_host_marker: String,

    /// Where the error ledger is written at the end of a run.
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// Per-request timeout for both platforms.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Targets processed concurrently within one organization.
    #[serde(default = "default_concurrency")]
    pub target_concurrency: usize,
}

fn default_api_version() -> String {
    "2024-10-15".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_source_types() -> Vec<String> {
    ["github", "github-enterprise", "github-cloud-app"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_github_api_url() -> Url {
    Url::parse("https://api.github.com").expect("static URL parses")
}

fn default_host_marker() -> String {
    "github.com".to_string()
}

fn default_error_log() -> PathBuf {
    PathBuf::from("tagging_errors.log")
}

fn default_timeout() -> u64 {
    30
}

fn default_concurrency() -> usize {
    1
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            api_version: default_api_version(),
            page_limit: default_page_limit(),
            allowed_source_types: default_source_types(),
            github_api_url: default_github_api_url(),
            github_host_marker: default_host_marker(),
            error_log: default_error_log(),
            request_timeout_secs: default_timeout(),
            target_concurrency: default_concurrency(),
        }
    }
}

impl TaggerConfig {
    /// Returns the tagger home directory (`~/.branchtag/`).
    pub fn home_dir() -> Result<PathBuf, TaggerError> {
        let base = dirs::home_dir().ok_or_else(|| TaggerError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".branchtag"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Result<PathBuf, TaggerError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load config from the default location, or return defaults if not found.
    pub fn load() -> Result<Self, TaggerError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, TaggerError> {
        if !path.exists() {
            return Err(TaggerError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TaggerError::Serialization(e.to_string()))
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), TaggerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TaggerError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Initialize the tagger home directory with default config.
    pub fn init() -> Result<PathBuf, TaggerError> {
        let home = Self::home_dir()?;
        std::fs::create_dir_all(&home)?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            Self::default().save_to(&config_path)?;
        }

        Ok(config_path)
    }

    /// Check requested source types against the allow-list.
    ///
    /// An empty request is valid and means "no filter".
    pub fn validate_source_types(&self, requested: &[String]) -> Result<Vec<String>, TaggerError> {
        let invalid: Vec<String> = requested
            .iter()
            .filter(|t| !self.allowed_source_types.contains(t))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(TaggerError::InvalidSourceType {
                invalid,
                allowed: self.allowed_source_types.join(", "),
            });
        }
        Ok(requested.to_vec())
    }
}
