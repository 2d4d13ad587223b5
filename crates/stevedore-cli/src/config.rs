//! Optional configuration file
//!
//! Read from `--config` or `~/.stevedore.yaml`. Every field is optional;
//! command-line flags override the file and the file overrides built-in
//! defaults.
//!
//! ```yaml
//! kubeconfig: /home/ops/.kube/staging
//! context: staging
//! helmBinary: /usr/local/bin/helm
//! pollInterval: 2s
//! dependencyTimeout: 5m
//! chartTimeout: 8m
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stevedore_kube::{GatePolicy, OrchestratorConfig};

use crate::error::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = ".stevedore.yaml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub helm_binary: Option<String>,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub dependency_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub chart_timeout: Option<Duration>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Load the explicit file, or the default one if it exists
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config_with_help(
                format!("cannot read {}: {}", path.display(), e),
                "Pass an existing file with --config or remove the flag",
            )
        })?;
        Self::from_yaml(&content).map_err(|e| {
            CliError::config_with_help(
                format!("{}: {}", path.display(), e),
                "Known keys: kubeconfig, context, helmBinary, pollInterval, dependencyTimeout, chartTimeout",
            )
        })
    }

    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn helm_binary(&self) -> &str {
        self.helm_binary.as_deref().unwrap_or("helm")
    }

    /// Orchestrator settings with the file's durations applied
    pub fn orchestrator_config(&self, gate_policy: GatePolicy, wait_for_charts: bool) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        OrchestratorConfig {
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            dependency_timeout: self.dependency_timeout.unwrap_or(defaults.dependency_timeout),
            chart_timeout: self.chart_timeout.unwrap_or(defaults.chart_timeout),
            wait_for_charts,
            gate_policy,
        }
    }
}
