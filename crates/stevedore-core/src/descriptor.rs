//! Manifest descriptor model
//!
//! A manifest declares charts, packages grouping those charts, and explicit
//! dependency declarations between them:
//!
//! ```yaml
//! metadata:
//!   name: install-manifest
//!   kind: manifest
//! charts:
//!   - name: redis
//!     namespace: paas
//!     chartLocator: file:///charts/redis-17.3.7.tgz
//!     releaseName: test-redis
//!     timeout: 600
//!     values:
//!       - url: redis/values.yaml
//! packages:
//!   - name: cache-package
//!     charts:
//!       - name: memcached
//!         kind: chart
//! dependencies:
//!   - name: cache-package
//!     requires:
//!       - name: redis
//!         kind: chart
//! ```
//!
//! The descriptor is loaded once and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::unit::{UnitKind, UnitRef};

/// Location of a values file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuesRef {
    pub url: String,
}

/// A single deployable chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescriptor {
    /// Unit name, unique within the manifest
    pub name: String,

    /// Informational chart name (e.g. `bitnami/redis`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_name: Option<String>,

    /// Target namespace
    pub namespace: String,

    /// Where to fetch the chart from (`file:` URL, path, repo or OCI ref)
    pub chart_locator: String,

    /// Release name the chart is deployed under
    pub release_name: String,

    /// Seconds to wait for the release to become ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Values files, merged in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValuesRef>,
}

impl ChartDescriptor {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Values file paths in merge order
    pub fn values_files(&self) -> Vec<PathBuf> {
        self.values.iter().map(|v| PathBuf::from(&v.url)).collect()
    }

    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::chart(&self.name)
    }
}

/// A named grouping of charts installed together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,

    /// Member charts, referenced by name
    #[serde(default, rename = "charts")]
    pub members: Vec<UnitRef>,
}

impl PackageDescriptor {
    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::package(&self.name)
    }
}

/// Explicit "requires" edges for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub name: String,

    #[serde(default)]
    pub requires: Vec<UnitRef>,
}

/// The top-level manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    pub metadata: UnitRef,

    #[serde(default)]
    pub charts: Vec<ChartDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageDescriptor>,

    #[serde(default, rename = "dependencies", skip_serializing_if = "Vec::is_empty")]
    pub dependency_declarations: Vec<DependencyDeclaration>,
}

impl ManifestDescriptor {
    /// Parse a descriptor from an already rendered YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let descriptor: ManifestDescriptor = serde_yaml::from_str(yaml)?;
        Ok(descriptor)
    }

    /// Name of the manifest root unit
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The manifest root as a unit reference
    pub fn root(&self) -> UnitRef {
        UnitRef::manifest(&self.metadata.name)
    }

    pub fn chart(&self, name: &str) -> Option<&ChartDescriptor> {
        self.charts.iter().find(|c| c.name == name)
    }

    pub fn package(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Resolve a name to the unit it designates, with its declared kind
    pub fn lookup(&self, name: &str) -> Option<UnitRef> {
        if self.chart(name).is_some() {
            Some(UnitRef::chart(name))
        } else if self.package(name).is_some() {
            Some(UnitRef::package(name))
        } else if self.metadata.name == name {
            Some(self.root())
        } else {
            None
        }
    }

    /// Directly declared charts then packages, in declaration order
    pub fn top_level_units(&self) -> Vec<UnitRef> {
        self.charts
            .iter()
            .map(ChartDescriptor::unit_ref)
            .chain(self.packages.iter().map(PackageDescriptor::unit_ref))
            .collect()
    }

    /// Check structural invariants
    ///
    /// Unknown dependency references are not checked here; the graph
    /// builder decides how to treat them.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.name.trim().is_empty() {
            return Err(CoreError::InvalidManifest {
                message: "metadata.name must not be empty".to_string(),
            });
        }
        if self.metadata.kind != UnitKind::Manifest {
            return Err(CoreError::InvalidManifest {
                message: format!(
                    "metadata.kind must be 'manifest', found '{}'",
                    self.metadata.kind
                ),
            });
        }

        let mut seen: HashMap<&str, UnitKind> = HashMap::new();
        seen.insert(&self.metadata.name, UnitKind::Manifest);

        for chart in &self.charts {
            check_unique(&mut seen, &chart.name, UnitKind::Chart)?;
            for (field, value) in [
                ("namespace", &chart.namespace),
                ("chartLocator", &chart.chart_locator),
                ("releaseName", &chart.release_name),
            ] {
                if value.trim().is_empty() {
                    return Err(CoreError::InvalidManifest {
                        message: format!("chart '{}' has an empty {}", chart.name, field),
                    });
                }
            }
        }

        for package in &self.packages {
            check_unique(&mut seen, &package.name, UnitKind::Package)?;
        }

        Ok(())
    }

    /// Make relative values-file paths relative to `base_dir`
    ///
    /// Absolute paths and URLs with a scheme are left untouched.
    pub fn resolve_values_paths(&mut self, base_dir: &Path) {
        for chart in &mut self.charts {
            for values in &mut chart.values {
                let url = values.url.trim();
                if let Some(path) = url.strip_prefix("file://") {
                    values.url = path.to_string();
                } else if !url.contains("://") && Path::new(url).is_relative() {
                    values.url = base_dir.join(url).to_string_lossy().into_owned();
                }
            }
        }
    }
}

fn check_unique<'a>(
    seen: &mut HashMap<&'a str, UnitKind>,
    name: &'a str,
    kind: UnitKind,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidManifest {
            message: format!("a {} has an empty name", kind),
        });
    }
    if let Some(first) = seen.insert(name, kind) {
        return Err(CoreError::DuplicateUnit {
            name: name.to_string(),
            first: first.to_string(),
            second: kind.to_string(),
        });
    }
    Ok(())
}
