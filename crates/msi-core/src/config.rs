use crate::error::{HarnessError, Result};
use crate::DEFAULT_ABORT_EXIT_CODE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session-wide configuration
///
/// Loaded once from an optional YAML file, overlaid with command line flags and
/// then passed by reference to everything that needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Kubernetes API server URL of the cluster under test
    pub kube_api_url: Option<String>,
    /// Storage classes the cluster must provide
    pub storage_classes: Vec<String>,
    /// Session log file, removed at session start
    pub log_file: PathBuf,
    pub log_collector: LogCollectorConfig,
    pub sanity: SanityGateConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            kube_api_url: None,
            storage_classes: Vec::new(),
            log_file: PathBuf::from("msi-tests.log"),
            log_collector: LogCollectorConfig::default(),
            sanity: SanityGateConfig::default(),
        }
    }
}

/// Where collected logs and failure artifacts go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogCollectorConfig {
    /// Collect extra resources for failed tests
    pub enabled: bool,
    pub base_dir: PathBuf,
}

impl Default for LogCollectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dir: PathBuf::from("tests-collected-info"),
        }
    }
}

/// Failure handling of the cluster sanity gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanityGateConfig {
    /// Abort the whole session on failure. Multi-cluster runs turn this off.
    pub exit_on_failure: bool,
    pub exit_code: i32,
}

impl Default for SanityGateConfig {
    fn default() -> Self {
        Self {
            exit_on_failure: true,
            exit_code: DEFAULT_ABORT_EXIT_CODE,
        }
    }
}

impl HarnessConfig {
    /// Load a config from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| {
            HarnessError::ConfigUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        debug!(path = %path.display(), "Loading harness config");

        serde_yaml::from_str(&data).map_err(|e| HarnessError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Kubernetes API URL, or an error naming the flag to set
    pub fn require_kube_api_url(&self) -> Result<&str> {
        self.kube_api_url.as_deref().ok_or_else(|| {
            HarnessError::missing_setting(
                "kube_api_url",
                "Pass --kube-api-url <url>, set KUBE_API_URL, or add kube_api_url to the config file",
            )
        })
    }

    /// Pretty JSON dump of the effective config, used for the session log
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::serialization(e.to_string()))
    }
}
