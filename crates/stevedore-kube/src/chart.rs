//! Chart units

use stevedore_core::{ChartDescriptor, InstallStatus, SystemContext, UnitRef, Values};

use crate::backend::{ChartBackend, ChartRequest, ReleaseInfo};
use crate::error::Result;
use crate::inspector::ClusterInspector;

/// A chart with its values merged and ready to deploy
#[derive(Debug, Clone, PartialEq)]
pub struct ChartUnit {
    descriptor: ChartDescriptor,
    values: Values,
}

impl ChartUnit {
    pub fn new(descriptor: ChartDescriptor, values: Values) -> Self {
        Self { descriptor, values }
    }

    /// Read and merge the chart's values files, later files winning
    pub fn load(descriptor: &ChartDescriptor) -> Result<Self> {
        let values = Values::from_files(&descriptor.values_files())?;
        Ok(Self::new(descriptor.clone(), values))
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ChartDescriptor {
        &self.descriptor
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn unit_ref(&self) -> UnitRef {
        self.descriptor.unit_ref()
    }

    /// Release name, honoring a context override
    pub fn release_name<'a>(&'a self, ctx: &'a SystemContext) -> &'a str {
        ctx.release_name_or(&self.descriptor.release_name)
    }

    /// Namespace, honoring a context override
    pub fn namespace<'a>(&'a self, ctx: &'a SystemContext) -> &'a str {
        ctx.namespace_or(&self.descriptor.namespace)
    }

    pub fn request(&self, ctx: &SystemContext) -> ChartRequest {
        ChartRequest {
            release_name: self.release_name(ctx).to_string(),
            namespace: self.namespace(ctx).to_string(),
            chart_ref: self.descriptor.chart_locator.clone(),
            values: self.values.clone(),
            timeout: self.descriptor.timeout(),
        }
    }

    /// Install or upgrade the release
    pub async fn install<B>(&self, backend: &B, ctx: &SystemContext) -> Result<ReleaseInfo>
    where
        B: ChartBackend + ?Sized,
    {
        backend.install(&self.request(ctx), ctx).await
    }

    /// Remove the release
    ///
    /// Returns `false` without calling the backend when the release is not
    /// installed.
    pub async fn uninstall<B>(&self, backend: &B, ctx: &SystemContext) -> Result<bool>
    where
        B: ChartBackend + ?Sized,
    {
        let release = self.release_name(ctx);
        let namespace = self.namespace(ctx);

        if backend.status(release, namespace, ctx).await? == InstallStatus::NotInstalled {
            tracing::info!(chart = %self.name(), release = %release, "release not installed, nothing to remove");
            return Ok(false);
        }
        backend.uninstall(release, namespace, ctx).await?;
        Ok(true)
    }

    /// Observed status of the release
    ///
    /// A release the backend does not know is NotInstalled. Otherwise the
    /// workloads found in the cluster decide, except that a release owning
    /// no workloads takes the backend's verdict.
    pub async fn status<B, I>(&self, backend: &B, inspector: &I, ctx: &SystemContext) -> Result<InstallStatus>
    where
        B: ChartBackend + ?Sized,
        I: ClusterInspector + ?Sized,
    {
        let release = self.release_name(ctx);
        let namespace = self.namespace(ctx);

        let recorded = backend.status(release, namespace, ctx).await?;
        if recorded == InstallStatus::NotInstalled {
            return Ok(InstallStatus::NotInstalled);
        }

        let resources = inspector.list_workloads_for_release(release, namespace).await?;
        if resources.is_empty() {
            return Ok(recorded);
        }
        Ok(resources.status())
    }
}
