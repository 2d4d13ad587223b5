//! The closed set of things an orchestrator can install

use stevedore_core::{UnitKind, UnitRef};

use crate::chart::ChartUnit;
use crate::package::PackageUnit;

/// A unit of installation, dispatched by kind
#[derive(Debug, Clone, PartialEq)]
pub enum Installable {
    Chart(ChartUnit),
    Package(PackageUnit),
    /// The manifest root; installing it marks completion of its children
    Manifest { name: String },
}

impl Installable {
    pub fn name(&self) -> &str {
        match self {
            Self::Chart(chart) => chart.name(),
            Self::Package(package) => package.name(),
            Self::Manifest { name } => name,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            Self::Chart(_) => UnitKind::Chart,
            Self::Package(_) => UnitKind::Package,
            Self::Manifest { .. } => UnitKind::Manifest,
        }
    }

    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::new(self.name(), self.kind())
    }

    pub fn as_chart(&self) -> Option<&ChartUnit> {
        match self {
            Self::Chart(chart) => Some(chart),
            _ => None,
        }
    }
}

impl From<ChartUnit> for Installable {
    fn from(chart: ChartUnit) -> Self {
        Self::Chart(chart)
    }
}

impl From<PackageUnit> for Installable {
    fn from(package: PackageUnit) -> Self {
        Self::Package(package)
    }
}
