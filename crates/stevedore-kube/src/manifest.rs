//! Runtime view of a loaded manifest
//!
//! Pairs the immutable descriptor with its dependency graph and one
//! [`Installable`] per declared unit, keyed by name.

use indexmap::IndexMap;
use stevedore_core::{
    DependencyGraph, InstallOrder, ManifestDescriptor, ResolveOptions, UnitRef,
};

use crate::chart::ChartUnit;
use crate::error::Result;
use crate::installable::Installable;
use crate::package::PackageUnit;

#[derive(Debug, Clone)]
pub struct Manifest {
    descriptor: ManifestDescriptor,
    graph: DependencyGraph,
    options: ResolveOptions,
    units: IndexMap<String, Installable>,
}

impl Manifest {
    /// Build the unit table, reading every chart's values files
    ///
    /// Fails on an invalid descriptor, an unreadable values file, or, under
    /// strict options, an unknown reference or a cycle.
    pub fn load(descriptor: ManifestDescriptor, options: &ResolveOptions) -> Result<Self> {
        descriptor.validate()?;
        let graph = DependencyGraph::build_with(&descriptor, options)?;

        let mut units = IndexMap::new();
        for chart in &descriptor.charts {
            units.insert(chart.name.clone(), Installable::Chart(ChartUnit::load(chart)?));
        }
        for package in &descriptor.packages {
            units.insert(package.name.clone(), Installable::Package(PackageUnit::from(package)));
        }
        units.insert(
            descriptor.name().to_string(),
            Installable::Manifest {
                name: descriptor.name().to_string(),
            },
        );

        let manifest = Self {
            descriptor,
            graph,
            options: *options,
            units,
        };
        // surface strict-mode cycles before anything is dispatched
        manifest.install_order()?;
        Ok(manifest)
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn root(&self) -> UnitRef {
        self.descriptor.root()
    }

    pub fn descriptor(&self) -> &ManifestDescriptor {
        &self.descriptor
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn unit(&self, name: &str) -> Option<&Installable> {
        self.units.get(name)
    }

    pub fn chart(&self, name: &str) -> Option<&ChartUnit> {
        self.unit(name).and_then(Installable::as_chart)
    }

    /// Declared charts in declaration order
    pub fn charts(&self) -> impl Iterator<Item = &ChartUnit> {
        self.units.values().filter_map(Installable::as_chart)
    }

    /// Install order, resolved afresh on every call
    pub fn install_order(&self) -> Result<InstallOrder> {
        Ok(InstallOrder::resolve_with(
            &self.descriptor,
            &self.graph,
            &self.options,
        )?)
    }
}
