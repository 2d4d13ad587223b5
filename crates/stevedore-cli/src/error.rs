//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use stevedore_engine::EngineError;
use stevedore_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Manifest could not be read, rendered or parsed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    /// Cluster access, chart backend or manifest preparation failed
    #[error("{0}")]
    #[diagnostic(code(stevedore::cli::cluster))]
    Kube(#[from] KubeError),

    /// Configuration file is unreadable or malformed
    #[error("Configuration error: {message}")]
    #[diagnostic(code(stevedore::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(stevedore::cli::io))]
    Io { message: String },

    /// Some units did not succeed
    #[error("{operation} of '{manifest}' failed: {failed} unit(s) did not succeed")]
    #[diagnostic(
        code(stevedore::cli::run_failed),
        help("Units installed before the failure are left in place; fix the cause and re-run")
    )]
    RunFailed {
        operation: String,
        manifest: String,
        failed: usize,
    },

    /// Interrupted before every unit was handled
    #[error("{operation} of '{manifest}' was cancelled")]
    #[diagnostic(code(stevedore::cli::cancelled))]
    Cancelled { operation: String, manifest: String },

    /// Output could not be serialized
    #[error("Internal error: {message}")]
    #[diagnostic(code(stevedore::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Engine(EngineError::Template(_)) => exit_codes::TEMPLATE_ERROR,
            CliError::Engine(EngineError::Io { .. }) => exit_codes::IO_ERROR,
            CliError::Engine(_) => exit_codes::DESCRIPTOR_ERROR,
            CliError::Kube(KubeError::Core(_)) => exit_codes::DESCRIPTOR_ERROR,
            CliError::Kube(KubeError::ScratchWrite { .. }) => exit_codes::IO_ERROR,
            CliError::Kube(_) => exit_codes::CLUSTER_ERROR,
            CliError::Config { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::RunFailed { .. } => exit_codes::RUN_FAILED,
            CliError::Cancelled { .. } => exit_codes::ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
