//! Execution context handed to every unit operation

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Process-wide settings shared by every unit in a run
///
/// Built once from command-line flags and configuration, then shared
/// read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct GlobalContext {
    /// Path to the kubeconfig used for cluster access
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to select
    pub kube_context: Option<String>,

    /// Path to the manifest document
    pub manifest_path: PathBuf,

    /// Key/value overrides applied when templating the manifest
    pub overrides: IndexMap<String, String>,
}

/// Target of a single unit operation
///
/// Created once per top-level call; every per-unit dispatch receives its own
/// copy through [`SystemContext::for_unit`], so overrides applied for one unit
/// never leak to its siblings.
#[derive(Debug, Clone)]
pub struct SystemContext {
    /// Name of the context (the manifest name for top-level runs)
    pub name: String,

    /// Namespace override; when unset the chart's own namespace applies
    pub namespace: Option<String>,

    /// Release name override; when unset the chart's own release name applies
    pub release_name: Option<String>,

    /// Scratch directory for temporary files
    pub work_dir: PathBuf,

    /// Shared global settings
    pub global: Arc<GlobalContext>,
}

impl SystemContext {
    pub fn new(name: impl Into<String>, work_dir: impl Into<PathBuf>, global: Arc<GlobalContext>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            release_name: None,
            work_dir: work_dir.into(),
            global,
        }
    }

    /// Independent copy for a single unit dispatch
    pub fn for_unit(&self, unit: &str) -> Self {
        let mut ctx = self.clone();
        ctx.name = unit.to_string();
        ctx
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_release_name(mut self, release_name: impl Into<String>) -> Self {
        self.release_name = Some(release_name.into());
        self
    }

    /// Namespace to use, falling back to the given default
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }

    /// Release name to use, falling back to the given default
    pub fn release_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.release_name.as_deref().unwrap_or(default)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_unit_is_independent() {
        let global = Arc::new(GlobalContext::default());
        let base = SystemContext::new("manifest", "/tmp/work", global);

        let redis = base.for_unit("redis").with_namespace("cache");
        let sibling = base.for_unit("postgres");

        assert_eq!(redis.namespace_or("default"), "cache");
        assert_eq!(sibling.namespace_or("default"), "default");
        assert_eq!(base.namespace, None);
        assert_eq!(sibling.name, "postgres");
    }

    #[test]
    fn test_release_override() {
        let ctx = SystemContext::new("m", "/tmp", Arc::new(GlobalContext::default()));
        assert_eq!(ctx.release_name_or("test-redis"), "test-redis");

        let ctx = ctx.with_release_name("blue-redis");
        assert_eq!(ctx.release_name_or("test-redis"), "blue-redis");
    }

    #[test]
    fn test_global_is_shared() {
        let global = Arc::new(GlobalContext {
            kube_context: Some("kind-dev".to_string()),
            ..Default::default()
        });
        let ctx = SystemContext::new("m", "/tmp", global.clone());
        let unit = ctx.for_unit("redis");

        assert!(Arc::ptr_eq(&unit.global, &global));
    }
}
