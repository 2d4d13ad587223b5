//! Dependency graph construction
//!
//! The graph maps each unit name to the ordered list of units it must wait
//! on. It is built from the explicit dependency declarations of a manifest
//! plus one synthetic entry: the manifest root requires every directly
//! declared chart and package, in declaration order.
//!
//! Package members get no edges of their own. A package installs its members
//! itself; the resolver only marks them visited when the package is placed.

use indexmap::IndexMap;

use crate::descriptor::ManifestDescriptor;
use crate::error::{CoreError, Result};
use crate::unit::UnitRef;

/// Policy knobs for graph construction and order resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Fail on references to units the manifest does not declare
    /// (default: accept them as no-op edges)
    pub strict_references: bool,

    /// Fail on dependency cycles (default: truncate the re-entrant edge)
    pub reject_cycles: bool,
}

impl ResolveOptions {
    /// Both checks enabled
    pub fn strict() -> Self {
        Self {
            strict_references: true,
            reject_cycles: true,
        }
    }
}

/// Required-before edges keyed by unit name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    root: UnitRef,
    edges: IndexMap<String, Vec<UnitRef>>,
}

impl DependencyGraph {
    /// Build the graph with the permissive default policy
    pub fn build(descriptor: &ManifestDescriptor) -> Self {
        Self::assemble(descriptor)
    }

    /// Build the graph, rejecting unknown references when requested
    pub fn build_with(descriptor: &ManifestDescriptor, options: &ResolveOptions) -> Result<Self> {
        let unknown = unknown_references(descriptor);

        if let Some((from, name)) = unknown.first() {
            if options.strict_references {
                return Err(CoreError::UnknownReference {
                    from: from.clone(),
                    name: name.clone(),
                });
            }
        }
        for (from, name) in &unknown {
            tracing::warn!(from = %from, reference = %name, "ignoring reference to undeclared unit");
        }

        Ok(Self::assemble(descriptor))
    }

    fn assemble(descriptor: &ManifestDescriptor) -> Self {
        let root = descriptor.root();
        let mut edges: IndexMap<String, Vec<UnitRef>> = IndexMap::new();

        for declaration in &descriptor.dependency_declarations {
            edges
                .entry(declaration.name.clone())
                .or_default()
                .extend(declaration.requires.iter().cloned());
        }

        let root_edges = edges.entry(root.name.clone()).or_default();
        for unit in descriptor.top_level_units() {
            if !root_edges.iter().any(|u| u.name == unit.name) {
                root_edges.push(unit);
            }
        }

        Self { root, edges }
    }

    /// The manifest root unit
    pub fn root(&self) -> &UnitRef {
        &self.root
    }

    /// Direct dependencies of a unit, in declaration order
    pub fn dependencies_of(&self, name: &str) -> &[UnitRef] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate over all `(unit, dependencies)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[UnitRef])> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of units with at least one entry
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Every `(referencing unit, unknown name)` pair in the manifest
///
/// Covers dependency declaration keys, their required units and package
/// members.
pub fn unknown_references(descriptor: &ManifestDescriptor) -> Vec<(String, String)> {
    let mut unknown = Vec::new();

    for declaration in &descriptor.dependency_declarations {
        if descriptor.lookup(&declaration.name).is_none() {
            unknown.push((descriptor.name().to_string(), declaration.name.clone()));
        }
        for required in &declaration.requires {
            if descriptor.lookup(&required.name).is_none() {
                unknown.push((declaration.name.clone(), required.name.clone()));
            }
        }
    }

    for package in &descriptor.packages {
        for member in &package.members {
            if descriptor.chart(&member.name).is_none() {
                unknown.push((package.name.clone(), member.name.clone()));
            }
        }
    }

    unknown
}
