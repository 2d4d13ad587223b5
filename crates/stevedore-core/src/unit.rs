//! Unit identity: the name/kind pair used as graph-node identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an installable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A single deployable chart
    Chart,
    /// A named grouping of charts
    Package,
    /// The manifest root
    Manifest,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Package => "package",
            Self::Manifest => "manifest",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a unit by name and kind
///
/// Names are unique within a manifest, so equality of two refs with the same
/// name but different kinds only happens for malformed declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRef {
    pub name: String,
    pub kind: UnitKind,
}

impl UnitRef {
    pub fn new(name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn chart(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Chart)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Package)
    }

    pub fn manifest(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Manifest)
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}
