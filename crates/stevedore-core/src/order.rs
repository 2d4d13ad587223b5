//! Install order resolution
//!
//! Linearizes the dependency graph with a depth-first traversal keyed by unit
//! name:
//!
//! 1. A unit already visited contributes nothing, so a shared ancestor
//!    reachable through several paths is scheduled once, at first visitation.
//! 2. Otherwise each dependency edge is resolved first, in declaration order.
//! 3. The unit itself is appended and marked visited. A package first
//!    resolves the dependencies of its member charts, then marks the members
//!    visited without scheduling them on their own.
//!
//! Resolution starts at the manifest root, then sweeps the top-level charts
//! and packages in declaration order to pick up anything still unvisited.
//! Identical descriptors always produce identical orders.

use serde::Serialize;
use std::collections::HashSet;

use crate::descriptor::ManifestDescriptor;
use crate::error::{CoreError, Result};
use crate::graph::{DependencyGraph, ResolveOptions};
use crate::unit::{UnitKind, UnitRef};

/// Ordered sequence of units, each preceded by its transitive dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallOrder(Vec<UnitRef>);

impl InstallOrder {
    /// Resolve the install order with the permissive default policy
    pub fn resolve(descriptor: &ManifestDescriptor, graph: &DependencyGraph) -> Result<Self> {
        Self::resolve_with(descriptor, graph, &ResolveOptions::default())
    }

    pub fn resolve_with(
        descriptor: &ManifestDescriptor,
        graph: &DependencyGraph,
        options: &ResolveOptions,
    ) -> Result<Self> {
        let mut resolver = Resolver {
            descriptor,
            graph,
            options,
            visited: HashSet::new(),
            path: Vec::new(),
            order: Vec::new(),
        };

        resolver.visit(&graph.root().name)?;
        for unit in descriptor.top_level_units() {
            resolver.visit(&unit.name)?;
        }

        Ok(Self(resolver.order))
    }

    /// Units in install order
    pub fn units(&self) -> &[UnitRef] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitRef> {
        self.0.iter()
    }

    /// Units in uninstall order
    pub fn reversed(&self) -> Vec<UnitRef> {
        self.0.iter().rev().cloned().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|u| u.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|u| u.name == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a InstallOrder {
    type Item = &'a UnitRef;
    type IntoIter = std::slice::Iter<'a, UnitRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

struct Resolver<'a> {
    descriptor: &'a ManifestDescriptor,
    graph: &'a DependencyGraph,
    options: &'a ResolveOptions,
    visited: HashSet<String>,
    /// Units currently being resolved, outermost first
    path: Vec<String>,
    order: Vec<UnitRef>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if self.visited.contains(name) {
            return Ok(());
        }

        if let Some(start) = self.path.iter().position(|n| n == name) {
            let mut cycle: Vec<String> = self.path[start..].to_vec();
            cycle.push(name.to_string());
            if self.options.reject_cycles {
                return Err(CoreError::DependencyCycle { path: cycle });
            }
            tracing::warn!(cycle = %cycle.join(" -> "), "truncating dependency cycle");
            return Ok(());
        }

        let Some(unit) = self.descriptor.lookup(name) else {
            if self.options.strict_references {
                return Err(CoreError::UnknownReference {
                    from: self.path.last().cloned().unwrap_or_default(),
                    name: name.to_string(),
                });
            }
            tracing::debug!(unit = %name, "skipping undeclared unit");
            return Ok(());
        };

        self.path.push(name.to_string());
        let graph = self.graph;
        for dependency in graph.dependencies_of(name) {
            self.visit(&dependency.name)?;
        }

        let members = match unit.kind {
            UnitKind::Package => self
                .descriptor
                .package(name)
                .map(|p| p.members.as_slice())
                .unwrap_or_default(),
            _ => &[],
        };
        // Members are installed by the package, after their own dependencies
        for member in members {
            if self.visited.contains(&member.name) {
                continue;
            }
            self.path.push(member.name.clone());
            for dependency in graph.dependencies_of(&member.name) {
                self.visit(&dependency.name)?;
            }
            self.path.pop();
        }
        self.path.pop();

        self.visited.insert(name.to_string());
        for member in members {
            self.visited.insert(member.name.clone());
        }
        self.order.push(unit);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(yaml: &str) -> InstallOrder {
        let descriptor = ManifestDescriptor::from_yaml(yaml).unwrap();
        let graph = DependencyGraph::build(&descriptor);
        InstallOrder::resolve(&descriptor, &graph).unwrap()
    }

    fn resolve_strict(yaml: &str) -> Result<InstallOrder> {
        let descriptor = ManifestDescriptor::from_yaml(yaml).unwrap();
        let graph = DependencyGraph::build(&descriptor);
        InstallOrder::resolve_with(&descriptor, &graph, &ResolveOptions::strict())
    }

    const CACHE: &str = r#"
metadata:
  name: manifest-root
  kind: manifest
charts:
  - name: redis
    namespace: paas
    chartLocator: file:///charts/redis.tgz
    releaseName: test-redis
  - name: memcached
    namespace: paas
    chartLocator: file:///charts/memcached.tgz
    releaseName: test-memcached
packages:
  - name: cache-package
    charts:
      - name: memcached
        kind: chart
"#;

    const DIAMOND: &str = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: b, namespace: n, chartLocator: x, releaseName: b}
  - {name: c, namespace: n, chartLocator: x, releaseName: c}
  - {name: a, namespace: n, chartLocator: x, releaseName: a}
dependencies:
  - name: b
    requires: [{name: a, kind: chart}]
  - name: c
    requires: [{name: a, kind: chart}]
"#;

    #[test]
    fn test_cache_manifest_order() {
        let order = resolve(CACHE);
        assert_eq!(
            order.names(),
            vec!["redis", "memcached", "cache-package", "manifest-root"]
        );
        assert_eq!(order.units()[2].kind, UnitKind::Package);
        assert_eq!(order.units()[3].kind, UnitKind::Manifest);
    }

    #[test]
    fn test_diamond_collapses() {
        let order = resolve(DIAMOND);
        let names = order.names();

        assert_eq!(names.iter().filter(|n| **n == "a").count(), 1);
        let a = order.position("a").unwrap();
        assert!(a < order.position("b").unwrap());
        assert!(a < order.position("c").unwrap());
        assert_eq!(names, vec!["a", "b", "c", "root"]);
    }

    #[test]
    fn test_root_last_and_first_reversed() {
        for yaml in [CACHE, DIAMOND] {
            let order = resolve(yaml);
            assert_eq!(order.units().last().unwrap().kind, UnitKind::Manifest);
            assert_eq!(order.reversed()[0].kind, UnitKind::Manifest);
        }
    }

    #[test]
    fn test_every_unit_exactly_once() {
        let descriptor = ManifestDescriptor::from_yaml(DIAMOND).unwrap();
        let order = resolve(DIAMOND);

        for unit in descriptor.top_level_units() {
            assert_eq!(order.iter().filter(|u| **u == unit).count(), 1, "{}", unit);
        }
        assert_eq!(order.len(), descriptor.top_level_units().len() + 1);
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(resolve(DIAMOND), resolve(DIAMOND));
        assert_eq!(resolve(CACHE), resolve(CACHE));
    }

    #[test]
    fn test_package_before_member_marks_member_visited() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: memcached, namespace: n, chartLocator: x, releaseName: m}
  - {name: web, namespace: n, chartLocator: x, releaseName: w}
packages:
  - name: cache
    charts: [{name: memcached, kind: chart}]
dependencies:
  - name: web
    requires: [{name: cache, kind: package}]
"#;
        let mut descriptor = ManifestDescriptor::from_yaml(yaml).unwrap();
        // web first, so the package is reached before its member chart
        descriptor.charts.swap(0, 1);
        let graph = DependencyGraph::build(&descriptor);
        let order = InstallOrder::resolve(&descriptor, &graph).unwrap();

        assert_eq!(order.names(), vec!["cache", "web", "root"]);
    }

    #[test]
    fn test_package_member_dependencies_come_first() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: web, namespace: n, chartLocator: x, releaseName: w}
  - {name: memcached, namespace: n, chartLocator: x, releaseName: m}
  - {name: redis, namespace: n, chartLocator: x, releaseName: r}
packages:
  - name: cache-package
    charts: [{name: memcached, kind: chart}]
dependencies:
  - name: web
    requires: [{name: cache-package, kind: package}]
  - name: memcached
    requires: [{name: redis, kind: chart}]
"#;
        let order = resolve(yaml);

        assert_eq!(order.names(), vec!["redis", "cache-package", "web", "root"]);
        assert_eq!(order.position("memcached"), None);
    }

    #[test]
    fn test_package_member_cycle_is_reported() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: memcached, namespace: n, chartLocator: x, releaseName: m}
  - {name: redis, namespace: n, chartLocator: x, releaseName: r}
packages:
  - name: cache-package
    charts: [{name: memcached, kind: chart}]
dependencies:
  - name: root
    requires: [{name: cache-package, kind: package}]
  - name: memcached
    requires: [{name: redis, kind: chart}]
  - name: redis
    requires: [{name: memcached, kind: chart}]
"#;
        match resolve_strict(yaml).unwrap_err() {
            CoreError::DependencyCycle { path } => {
                assert_eq!(path, vec!["memcached", "redis", "memcached"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_reference_is_noop() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: a, namespace: n, chartLocator: x, releaseName: a}
dependencies:
  - name: a
    requires: [{name: ghost, kind: chart}]
"#;
        assert_eq!(resolve(yaml).names(), vec!["a", "root"]);

        let err = resolve_strict(yaml).unwrap_err();
        assert!(matches!(err, CoreError::UnknownReference { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_cycle_truncated_by_default() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: a, namespace: n, chartLocator: x, releaseName: a}
  - {name: b, namespace: n, chartLocator: x, releaseName: b}
dependencies:
  - name: a
    requires: [{name: b, kind: chart}]
  - name: b
    requires: [{name: a, kind: chart}]
"#;
        assert_eq!(resolve(yaml).names(), vec!["b", "a", "root"]);

        let err = resolve_strict(yaml).unwrap_err();
        match err {
            CoreError::DependencyCycle { path } => {
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_root_declaration_comes_first() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: a, namespace: n, chartLocator: x, releaseName: a}
  - {name: b, namespace: n, chartLocator: x, releaseName: b}
dependencies:
  - name: root
    requires: [{name: b, kind: chart}]
"#;
        let order = resolve(yaml);
        assert_eq!(order.names(), vec!["b", "a", "root"]);
    }

    #[test]
    fn test_reversed_order() {
        let order = resolve(CACHE);
        let reversed: Vec<String> = order.reversed().iter().map(ToString::to_string).collect();
        assert_eq!(
            reversed,
            vec![
                "manifest/manifest-root",
                "package/cache-package",
                "chart/memcached",
                "chart/redis",
            ]
        );
    }
}
