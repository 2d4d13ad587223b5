//! Error types for stevedore-kube

use std::path::PathBuf;
use thiserror::Error;

/// Result type for stevedore-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster or the chart backend
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be read or has no usable context
    #[error("invalid cluster configuration: {0}")]
    Config(String),

    /// The chart backend executable could not be started
    #[error("cannot run '{binary}': {source}\nHint: install Helm or set helmBinary in the config file")]
    BackendUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The chart backend reported a failure
    #[error("{operation} of release '{release}' in namespace '{namespace}' failed: {message}")]
    Backend {
        operation: String,
        release: String,
        namespace: String,
        message: String,
    },

    /// Values file could not be written to the scratch directory
    #[error("cannot write {path}: {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(#[from] stevedore_core::CoreError),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Errors raised before any unit is dispatched, which abort a run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KubeError::Config(_) | KubeError::BackendUnavailable { .. } | KubeError::Core(_)
        )
    }
}
