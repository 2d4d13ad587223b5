//! Manifest document loading
//!
//! A manifest is read, rendered as a template with the command-line
//! overrides, parsed into a [`ManifestDescriptor`], then has its values-file
//! paths rebased onto the manifest directory and is validated. Any failure
//! is fatal and happens before a cluster is touched.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use stevedore_core::{CoreError, ManifestDescriptor};

use crate::engine::Engine;
use crate::error::{DescriptorError, EngineError, Result};

/// A loaded, validated manifest
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub descriptor: ManifestDescriptor,

    /// Path the manifest was read from
    pub path: PathBuf,

    /// The document after templating
    pub rendered: String,
}

impl LoadedManifest {
    /// Directory relative values-file paths were resolved against
    pub fn base_dir(&self) -> &Path {
        parent_dir(&self.path)
    }
}

/// Loads manifest documents through the template engine
pub struct DescriptorLoader {
    engine: Engine,
}

impl Default for DescriptorLoader {
    fn default() -> Self {
        Self::new(Engine::default())
    }
}

impl DescriptorLoader {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Read, render, parse and validate the manifest at `path`
    pub fn load(&self, path: &Path, overrides: &IndexMap<String, String>) -> Result<LoadedManifest> {
        let template = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let base_dir = parent_dir(path);

        tracing::info!(path = %path.display(), overrides = ?overrides, "loading manifest");
        let (descriptor, rendered) =
            self.load_str(&template, &path.to_string_lossy(), base_dir, overrides)?;

        Ok(LoadedManifest {
            descriptor,
            path: path.to_path_buf(),
            rendered,
        })
    }

    /// Render and parse a manifest held in memory
    ///
    /// `name` is used in diagnostics; relative values files are resolved
    /// against `base_dir`.
    pub fn load_str(
        &self,
        template: &str,
        name: &str,
        base_dir: &Path,
        overrides: &IndexMap<String, String>,
    ) -> Result<(ManifestDescriptor, String)> {
        let rendered = self.engine.render_string(template, overrides, name)?;

        let mut descriptor = match ManifestDescriptor::from_yaml(&rendered) {
            Ok(descriptor) => descriptor,
            Err(CoreError::YamlParse(e)) => {
                return Err(DescriptorError::from_yaml(&e, name, &rendered).into());
            }
            Err(other) => return Err(other.into()),
        };

        descriptor.resolve_values_paths(base_dir);
        descriptor.validate()?;

        tracing::debug!(
            manifest = %descriptor.name(),
            charts = descriptor.charts.len(),
            packages = descriptor.packages.len(),
            "manifest loaded"
        );
        Ok((descriptor, rendered))
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
