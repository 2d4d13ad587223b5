//! Stevedore Core - Core types for dependency-ordered chart orchestration
//!
//! This crate provides the foundational types used throughout stevedore:
//! - `ManifestDescriptor`: The manifest model (charts, packages, dependency declarations)
//! - `UnitRef`: Name/kind identity of charts, packages and the manifest root
//! - `DependencyGraph`: Required-before edges derived from a manifest
//! - `InstallOrder`: Deterministic linearization of the graph
//! - `Values`: Configuration values with deep merge support
//! - `SystemContext`: Per-call execution context

pub mod context;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod order;
pub mod status;
pub mod unit;
pub mod values;

pub use context::{GlobalContext, SystemContext};
pub use descriptor::{
    ChartDescriptor, DependencyDeclaration, ManifestDescriptor, PackageDescriptor, ValuesRef,
};
pub use error::{CoreError, Result};
pub use graph::{DependencyGraph, ResolveOptions, unknown_references};
pub use order::InstallOrder;
pub use status::InstallStatus;
pub use unit::{UnitKind, UnitRef};
pub use values::{Values, parse_overrides};
