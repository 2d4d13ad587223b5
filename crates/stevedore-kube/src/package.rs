//! Package units

use stevedore_core::{PackageDescriptor, UnitRef};

/// A named group of charts installed and removed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUnit {
    name: String,
    members: Vec<String>,
}

impl PackageUnit {
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member chart names in declaration order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::package(&self.name)
    }
}

impl From<&PackageDescriptor> for PackageUnit {
    fn from(descriptor: &PackageDescriptor) -> Self {
        Self::new(
            &descriptor.name,
            descriptor.members.iter().map(|m| m.name.clone()).collect(),
        )
    }
}
