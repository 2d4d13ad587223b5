//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Duplicate unit name '{name}' (declared as {first} and {second})")]
    DuplicateUnit {
        name: String,
        first: String,
        second: String,
    },

    #[error("'{from}' references unknown unit '{name}'")]
    UnknownReference { from: String, name: String },

    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    #[error("Failed to read values file {path}: {message}")]
    ValuesFile { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
