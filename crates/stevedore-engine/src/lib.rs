//! Stevedore Engine - templated manifest loading
//!
//! Manifests are MiniJinja templates. This crate renders them with the
//! `--set` overrides, parses the result into a
//! [`ManifestDescriptor`](stevedore_core::ManifestDescriptor) and reports
//! failures as source-annotated diagnostics.

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod loader;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder};
pub use error::{DescriptorError, EngineError, Result, TemplateError, TemplateErrorKind};
pub use loader::{DescriptorLoader, LoadedManifest};
pub use suggestions::{AVAILABLE_FILTERS, AVAILABLE_FUNCTIONS};
