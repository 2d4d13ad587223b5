//! Dependency-ordered install, uninstall and status runs
//!
//! A run walks the install order one unit at a time:
//!
//! - **Install**: for each unit, wait for its direct dependencies to be
//!   ready, then dispatch by kind. Charts go to the backend and are
//!   optionally confirmed ready; packages install their member charts in
//!   order; the manifest root is a no-op marking completion.
//! - **Uninstall**: the same order reversed, without dependency gating.
//!
//! A failing unit never stops the run. Every unit is attempted and the
//! outcome of each is recorded in a [`RunReport`]. A chart is dispatched at
//! most once per run; a package reuses the outcome of a member chart that
//! was already handled.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use stevedore_core::{InstallStatus, SystemContext, UnitRef};
use tokio_util::sync::CancellationToken;

use crate::backend::ChartBackend;
use crate::chart::ChartUnit;
use crate::error::Result;
use crate::inspector::ClusterInspector;
use crate::installable::Installable;
use crate::manifest::Manifest;
use crate::package::PackageUnit;
use crate::waiter::{
    DEFAULT_CHART_READY_TIMEOUT, DEFAULT_DEPENDENCY_TIMEOUT, DEFAULT_POLL_INTERVAL,
    ReadinessWaiter, WaitOutcome,
};

/// What to do when a unit's dependencies are not ready
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Skip the unit and record it as blocked
    #[default]
    Block,
    /// Install anyway, recording the unmet dependencies
    Proceed,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    /// Wait on each direct dependency before installing a unit
    pub dependency_timeout: Duration,
    /// Post-install wait for charts that declare no timeout
    pub chart_timeout: Duration,
    /// Confirm each chart is ready after installing it
    pub wait_for_charts: bool,
    pub gate_policy: GatePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            dependency_timeout: DEFAULT_DEPENDENCY_TIMEOUT,
            chart_timeout: DEFAULT_CHART_READY_TIMEOUT,
            wait_for_charts: true,
            gate_policy: GatePolicy::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Uninstall,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Uninstall => f.write_str("uninstall"),
        }
    }
}

/// Result of dispatching one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum UnitResult {
    Succeeded,
    Failed { reason: String },
    /// Not attempted because dependencies failed or never became ready
    Blocked { dependencies: Vec<String> },
    Cancelled,
}

impl UnitResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for UnitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::Blocked { dependencies } => {
                write!(f, "blocked by {}", dependencies.join(", "))
            }
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub unit: UnitRef,
    pub result: UnitResult,
    pub duration: Duration,
    /// Dependencies that were not ready when the unit was installed anyway
    pub unmet_dependencies: Vec<String>,
}

/// Per-unit outcomes of an install or uninstall run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub operation: Operation,
    pub manifest: String,
    pub outcomes: Vec<UnitOutcome>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub cancelled: bool,
}

impl RunReport {
    /// True when the run completed and every unit succeeded
    pub fn success(&self) -> bool {
        !self.cancelled && self.outcomes.iter().all(|o| o.result.is_success())
    }

    pub fn outcome(&self, name: &str) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.unit.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartStatus {
    pub name: String,
    pub release_name: String,
    pub namespace: String,
    pub status: InstallStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub manifest: String,
    pub status: InstallStatus,
    pub charts: Vec<ChartStatus>,
}

enum Gate {
    Clear,
    Unmet {
        failed: Vec<String>,
        timed_out: Vec<String>,
    },
    Cancelled,
}

/// Bookkeeping for one run
struct Run {
    report: RunReport,
    start: Instant,
    /// Units handled so far and whether they succeeded
    dispatched: HashMap<String, bool>,
}

impl Run {
    fn new(operation: Operation, manifest: &str) -> Self {
        Self {
            report: RunReport {
                operation,
                manifest: manifest.to_string(),
                outcomes: Vec::new(),
                started_at: Utc::now(),
                duration: Duration::ZERO,
                cancelled: false,
            },
            start: Instant::now(),
            dispatched: HashMap::new(),
        }
    }

    fn record(&mut self, unit: &UnitRef, result: UnitResult, started: Instant, unmet: Vec<String>) {
        self.dispatched.insert(unit.name.clone(), result.is_success());
        self.report.outcomes.push(UnitOutcome {
            unit: unit.clone(),
            result,
            duration: started.elapsed(),
            unmet_dependencies: unmet,
        });
    }

    /// Whether `name` already failed in this run, directly or as an
    /// unattempted member of a failed package
    fn has_failed(&self, manifest: &Manifest, name: &str) -> bool {
        match self.dispatched.get(name) {
            Some(ok) => !ok,
            None => manifest.descriptor().packages.iter().any(|package| {
                package.members.iter().any(|m| m.name == name)
                    && self.dispatched.get(&package.name) == Some(&false)
            }),
        }
    }

    /// Earlier outcome of a chart handled in this run
    fn reuse(&self, name: &str) -> Option<UnitResult> {
        self.dispatched.get(name).map(|&ok| {
            if ok {
                UnitResult::Succeeded
            } else {
                UnitResult::Failed {
                    reason: format!("chart '{}' already failed in this run", name),
                }
            }
        })
    }

    fn finish(mut self) -> RunReport {
        self.report.duration = self.start.elapsed();
        self.report
    }
}

/// Units to wait on before installing `name`
///
/// A package also waits on the dependencies of its member charts, since it
/// installs them itself.
fn gate_dependencies<'a>(manifest: &'a Manifest, name: &str) -> Vec<&'a str> {
    let graph = manifest.graph();
    let mut dependencies: Vec<&str> = graph
        .dependencies_of(name)
        .iter()
        .map(|d| d.name.as_str())
        .collect();

    if let Some(Installable::Package(package)) = manifest.unit(name) {
        let members = package.members();
        for member in members {
            for dependency in graph.dependencies_of(member) {
                let dep = dependency.name.as_str();
                let internal = dep == name || members.iter().any(|m| m == dep);
                if !internal && !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
        }
    }
    dependencies
}

/// Drives install, uninstall and status runs over a manifest
pub struct Orchestrator<B, I> {
    backend: B,
    inspector: I,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl<B: ChartBackend, I: ClusterInspector> Orchestrator<B, I> {
    pub fn new(backend: B, inspector: I) -> Self {
        Self {
            backend,
            inspector,
            config: OrchestratorConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a token that aborts the run when cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    fn waiter(&self) -> ReadinessWaiter {
        ReadinessWaiter::new(self.config.poll_interval, self.cancel.clone())
    }

    /// Install every unit in dependency order
    ///
    /// Only errors that make the whole run meaningless (unresolvable order,
    /// missing backend) are returned as `Err`; unit failures are recorded in
    /// the report.
    pub async fn install(&self, manifest: &Manifest, ctx: &SystemContext) -> Result<RunReport> {
        let order = manifest.install_order()?;
        let mut run = Run::new(Operation::Install, manifest.name());
        tracing::info!(manifest = %manifest.name(), units = order.len(), "starting install");

        for unit in &order {
            if self.cancel.is_cancelled() {
                run.report.cancelled = true;
                break;
            }
            let Some(installable) = manifest.unit(&unit.name) else {
                continue;
            };
            let started = Instant::now();
            let unit_ctx = ctx.for_unit(&unit.name);

            let mut unmet = Vec::new();
            match self.gate(manifest, &unit.name, ctx, &run).await {
                Gate::Clear => {}
                Gate::Cancelled => {
                    run.record(unit, UnitResult::Cancelled, started, Vec::new());
                    run.report.cancelled = true;
                    break;
                }
                Gate::Unmet { failed, timed_out } => {
                    let mut dependencies = failed;
                    dependencies.extend(timed_out);
                    if self.config.gate_policy == GatePolicy::Block {
                        tracing::warn!(unit = %unit, dependencies = ?dependencies, "dependencies not ready, skipping");
                        run.record(unit, UnitResult::Blocked { dependencies }, started, Vec::new());
                        continue;
                    }
                    tracing::warn!(unit = %unit, dependencies = ?dependencies, "dependencies not ready, installing anyway");
                    unmet = dependencies;
                }
            }

            tracing::info!(unit = %unit, "installing");
            let result = match installable {
                Installable::Chart(chart) => self.install_chart(chart, &unit_ctx, &mut run).await?,
                Installable::Package(package) => {
                    self.install_package(manifest, package, &unit_ctx, &mut run).await?
                }
                Installable::Manifest { .. } => UnitResult::Succeeded,
            };

            let cancelled = result == UnitResult::Cancelled;
            run.record(unit, result, started, unmet);
            if cancelled {
                run.report.cancelled = true;
                break;
            }
        }

        let report = run.finish();
        tracing::info!(
            manifest = %report.manifest,
            success = report.success(),
            duration = ?report.duration,
            "install finished"
        );
        Ok(report)
    }

    /// Uninstall every unit in reverse install order
    pub async fn uninstall(&self, manifest: &Manifest, ctx: &SystemContext) -> Result<RunReport> {
        let order = manifest.install_order()?;
        let mut run = Run::new(Operation::Uninstall, manifest.name());
        tracing::info!(manifest = %manifest.name(), units = order.len(), "starting uninstall");

        for unit in order.reversed() {
            if self.cancel.is_cancelled() {
                run.report.cancelled = true;
                break;
            }
            let Some(installable) = manifest.unit(&unit.name) else {
                continue;
            };
            let started = Instant::now();
            let unit_ctx = ctx.for_unit(&unit.name);

            tracing::info!(unit = %unit, "uninstalling");
            let result = match installable {
                Installable::Chart(chart) => self.uninstall_chart(chart, &unit_ctx, &mut run).await?,
                Installable::Package(package) => {
                    self.uninstall_package(manifest, package, &unit_ctx, &mut run).await?
                }
                Installable::Manifest { .. } => UnitResult::Succeeded,
            };
            run.record(&unit, result, started, Vec::new());
        }

        let report = run.finish();
        tracing::info!(
            manifest = %report.manifest,
            success = report.success(),
            duration = ?report.duration,
            "uninstall finished"
        );
        Ok(report)
    }

    /// Aggregate status of the manifest's declared charts
    pub async fn status(&self, manifest: &Manifest, ctx: &SystemContext) -> Result<StatusReport> {
        let mut charts = Vec::new();
        for chart in manifest.charts() {
            let chart_ctx = ctx.for_unit(chart.name());
            let status = match chart.status(&self.backend, &self.inspector, &chart_ctx).await {
                Ok(status) => status,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(chart = %chart.name(), error = %e, "status check failed");
                    InstallStatus::NotReady
                }
            };
            charts.push(ChartStatus {
                name: chart.name().to_string(),
                release_name: chart.release_name(&chart_ctx).to_string(),
                namespace: chart.namespace(&chart_ctx).to_string(),
                status,
            });
        }

        Ok(StatusReport {
            manifest: manifest.name().to_string(),
            status: InstallStatus::aggregate(charts.iter().map(|c| c.status)),
            charts,
        })
    }

    /// Wait for every dependency of `name` to be ready, failing fast on units
    /// that already failed in this run
    async fn gate(&self, manifest: &Manifest, name: &str, ctx: &SystemContext, run: &Run) -> Gate {
        let waiter = self.waiter();
        let mut failed = Vec::new();
        let mut timed_out = Vec::new();

        for dep in gate_dependencies(manifest, name) {
            if manifest.unit(dep).is_none() {
                continue;
            }
            if run.has_failed(manifest, dep) {
                failed.push(dep.to_string());
                continue;
            }

            let dep_ctx = ctx.for_unit(dep);
            let outcome = waiter
                .wait_until(dep, self.config.dependency_timeout, || {
                    self.unit_status(manifest, dep, &dep_ctx)
                })
                .await;
            match outcome {
                WaitOutcome::Ready => {}
                WaitOutcome::TimedOut => timed_out.push(dep.to_string()),
                WaitOutcome::Cancelled => return Gate::Cancelled,
            }
        }

        if failed.is_empty() && timed_out.is_empty() {
            Gate::Clear
        } else {
            Gate::Unmet { failed, timed_out }
        }
    }

    /// Status of any unit, for polling; errors count as not ready
    async fn unit_status(&self, manifest: &Manifest, name: &str, ctx: &SystemContext) -> InstallStatus {
        match manifest.unit(name) {
            Some(Installable::Chart(chart)) => self.chart_status(chart, ctx).await,
            Some(Installable::Package(package)) => {
                let mut statuses = Vec::new();
                for member in package.members() {
                    if let Some(chart) = manifest.chart(member) {
                        statuses.push(self.chart_status(chart, &ctx.for_unit(member)).await);
                    }
                }
                InstallStatus::aggregate(statuses)
            }
            Some(Installable::Manifest { .. }) => {
                let mut statuses = Vec::new();
                for chart in manifest.charts() {
                    statuses.push(self.chart_status(chart, &ctx.for_unit(chart.name())).await);
                }
                InstallStatus::aggregate(statuses)
            }
            None => InstallStatus::NotInstalled,
        }
    }

    async fn chart_status(&self, chart: &ChartUnit, ctx: &SystemContext) -> InstallStatus {
        match chart.status(&self.backend, &self.inspector, ctx).await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(chart = %chart.name(), error = %e, "status poll failed");
                InstallStatus::NotReady
            }
        }
    }

    async fn install_chart(&self, chart: &ChartUnit, ctx: &SystemContext, run: &mut Run) -> Result<UnitResult> {
        if let Some(previous) = run.reuse(chart.name()) {
            tracing::debug!(chart = %chart.name(), "chart already handled in this run");
            return Ok(previous);
        }

        let result = match chart.install(&self.backend, ctx).await {
            Ok(info) => {
                tracing::info!(
                    chart = %chart.name(),
                    release = %info.name,
                    revision = ?info.revision,
                    status = %info.status,
                    "chart installed"
                );
                if self.config.wait_for_charts {
                    self.confirm_ready(chart, ctx).await
                } else {
                    UnitResult::Succeeded
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(chart = %chart.name(), error = %e, "chart install failed");
                UnitResult::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if result != UnitResult::Cancelled {
            run.dispatched.insert(chart.name().to_string(), result.is_success());
        }
        Ok(result)
    }

    async fn confirm_ready(&self, chart: &ChartUnit, ctx: &SystemContext) -> UnitResult {
        let timeout = chart.descriptor().timeout().unwrap_or(self.config.chart_timeout);
        let outcome = self
            .waiter()
            .wait_until(chart.name(), timeout, || self.chart_status(chart, ctx))
            .await;

        match outcome {
            WaitOutcome::Ready => UnitResult::Succeeded,
            WaitOutcome::TimedOut => UnitResult::Failed {
                reason: format!(
                    "release '{}' not ready after {}s",
                    chart.release_name(ctx),
                    timeout.as_secs()
                ),
            },
            WaitOutcome::Cancelled => UnitResult::Cancelled,
        }
    }

    async fn install_package(
        &self,
        manifest: &Manifest,
        package: &PackageUnit,
        ctx: &SystemContext,
        run: &mut Run,
    ) -> Result<UnitResult> {
        let mut failed = Vec::new();
        for member in package.members() {
            let Some(chart) = manifest.chart(member) else {
                tracing::warn!(package = %package.name(), member = %member, "skipping undeclared package member");
                continue;
            };
            if self.cancel.is_cancelled() {
                return Ok(UnitResult::Cancelled);
            }
            match self.install_chart(chart, &ctx.for_unit(member), run).await? {
                UnitResult::Succeeded => {}
                UnitResult::Cancelled => return Ok(UnitResult::Cancelled),
                _ => failed.push(member.clone()),
            }
        }
        Ok(package_result(failed))
    }

    async fn uninstall_chart(&self, chart: &ChartUnit, ctx: &SystemContext, run: &mut Run) -> Result<UnitResult> {
        if let Some(previous) = run.reuse(chart.name()) {
            return Ok(previous);
        }

        let result = match chart.uninstall(&self.backend, ctx).await {
            Ok(removed) => {
                if removed {
                    tracing::info!(chart = %chart.name(), release = %chart.release_name(ctx), "chart uninstalled");
                }
                UnitResult::Succeeded
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(chart = %chart.name(), error = %e, "chart uninstall failed");
                UnitResult::Failed {
                    reason: e.to_string(),
                }
            }
        };
        run.dispatched.insert(chart.name().to_string(), result.is_success());
        Ok(result)
    }

    async fn uninstall_package(
        &self,
        manifest: &Manifest,
        package: &PackageUnit,
        ctx: &SystemContext,
        run: &mut Run,
    ) -> Result<UnitResult> {
        let mut failed = Vec::new();
        for member in package.members().iter().rev() {
            let Some(chart) = manifest.chart(member) else {
                continue;
            };
            if !self.uninstall_chart(chart, &ctx.for_unit(member), run).await?.is_success() {
                failed.push(member.clone());
            }
        }
        Ok(package_result(failed))
    }
}

fn package_result(failed: Vec<String>) -> UnitResult {
    if failed.is_empty() {
        UnitResult::Succeeded
    } else {
        UnitResult::Failed {
            reason: format!("member charts failed: {}", failed.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChartBackend, MockInspector};
    use std::sync::Arc;
    use stevedore_core::{GlobalContext, ManifestDescriptor, ResolveOptions};

    const CACHE: &str = r#"
metadata:
  name: install-manifest
  kind: manifest
charts:
  - name: redis
    namespace: paas
    chartLocator: file:///charts/redis-17.3.7.tgz
    releaseName: test-redis
  - name: memcached
    namespace: paas
    chartLocator: file:///charts/memcached-6.3.0.tgz
    releaseName: test-memcached
packages:
  - name: cache-package
    charts:
      - name: memcached
        kind: chart
"#;

    const DEPENDENT: &str = r#"
metadata:
  name: app
  kind: manifest
charts:
  - name: redis
    namespace: paas
    chartLocator: bitnami/redis
    releaseName: test-redis
  - name: memcached
    namespace: paas
    chartLocator: bitnami/memcached
    releaseName: test-memcached
dependencies:
  - name: memcached
    requires:
      - name: redis
        kind: chart
"#;

    fn manifest(yaml: &str) -> Manifest {
        let descriptor = ManifestDescriptor::from_yaml(yaml).unwrap();
        Manifest::load(descriptor, &ResolveOptions::default()).unwrap()
    }

    fn ctx() -> SystemContext {
        SystemContext::new("run", "/tmp", Arc::new(GlobalContext::default()))
    }

    fn fast() -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_millis(10),
            dependency_timeout: Duration::from_millis(200),
            chart_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    fn orchestrator(
        backend: &MockChartBackend,
        inspector: &MockInspector,
    ) -> Orchestrator<MockChartBackend, MockInspector> {
        Orchestrator::new(backend.clone(), inspector.clone()).with_config(fast())
    }

    fn names(report: &RunReport) -> Vec<&str> {
        report.outcomes.iter().map(|o| o.unit.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_install_cache_manifest() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        let manifest = manifest(CACHE);

        let report = orchestrator(&backend, &inspector)
            .install(&manifest, &ctx())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(report.operation, Operation::Install);
        assert_eq!(
            names(&report),
            vec!["redis", "memcached", "cache-package", "install-manifest"]
        );
        assert_eq!(
            backend.calls(),
            vec!["install paas/test-redis", "install paas/test-memcached"]
        );
        assert_eq!(backend.operation_counts().installs, 2);
    }

    #[tokio::test]
    async fn test_install_diamond_runs_shared_dependency_once_first() {
        let yaml = r#"
metadata:
  name: root
  kind: manifest
charts:
  - name: b
    namespace: ns
    chartLocator: repo/b
    releaseName: b
  - name: c
    namespace: ns
    chartLocator: repo/c
    releaseName: c
  - name: a
    namespace: ns
    chartLocator: repo/a
    releaseName: a
dependencies:
  - name: b
    requires:
      - name: a
        kind: chart
  - name: c
    requires:
      - name: a
        kind: chart
"#;
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(yaml), &ctx())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(names(&report), vec!["a", "b", "c", "root"]);
        assert_eq!(backend.calls(), vec!["install ns/a", "install ns/b", "install ns/c"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_unrelated_units() {
        let backend = MockChartBackend::new();
        backend.fail_install("test-redis");
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(!report.success());
        assert!(!report.cancelled);
        assert!(matches!(
            report.outcome("redis").unwrap().result,
            UnitResult::Failed { .. }
        ));
        assert!(report.outcome("cache-package").unwrap().result.is_success());
        assert!(backend.is_installed("test-memcached", "paas"));
        assert_eq!(
            report.outcome("install-manifest").unwrap().result,
            UnitResult::Blocked {
                dependencies: vec!["redis".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_failed_dependency_blocks_dependent() {
        let backend = MockChartBackend::new();
        backend.fail_install("test-redis");
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(DEPENDENT), &ctx())
            .await
            .unwrap();

        assert_eq!(
            report.outcome("memcached").unwrap().result,
            UnitResult::Blocked {
                dependencies: vec!["redis".to_string()]
            }
        );
        assert!(!backend.is_installed("test-memcached", "paas"));
        assert_eq!(backend.operation_counts().installs, 1);
    }

    const MEMBER_DEPENDENCY: &str = r#"
metadata:
  name: root
  kind: manifest
charts:
  - {name: web, namespace: n, chartLocator: repo/web, releaseName: web}
  - {name: memcached, namespace: n, chartLocator: repo/memcached, releaseName: memcached}
  - {name: redis, namespace: n, chartLocator: repo/redis, releaseName: redis}
packages:
  - name: cache-package
    charts: [{name: memcached, kind: chart}]
dependencies:
  - name: web
    requires: [{name: cache-package, kind: package}]
  - name: memcached
    requires: [{name: redis, kind: chart}]
"#;

    #[tokio::test]
    async fn test_package_member_installed_after_its_dependencies() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(MEMBER_DEPENDENCY), &ctx())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(names(&report), vec!["redis", "cache-package", "web", "root"]);
        assert_eq!(
            backend.calls(),
            vec!["install n/redis", "install n/memcached", "install n/web"]
        );
    }

    #[tokio::test]
    async fn test_blocked_package_member_is_not_polled() {
        let backend = MockChartBackend::new();
        backend.fail_install("redis");
        let inspector = MockInspector::new();
        let orchestrator = Orchestrator::new(backend.clone(), inspector.clone()).with_config(
            OrchestratorConfig {
                dependency_timeout: Duration::from_secs(300),
                ..fast()
            },
        );

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.install(&manifest(MEMBER_DEPENDENCY), &ctx()),
        )
        .await
        .expect("blocked units must not wait for the dependency timeout")
        .unwrap();

        assert!(!report.success());
        assert_eq!(
            report.outcome("cache-package").unwrap().result,
            UnitResult::Blocked {
                dependencies: vec!["redis".to_string()]
            }
        );
        assert_eq!(
            report.outcome("web").unwrap().result,
            UnitResult::Blocked {
                dependencies: vec!["cache-package".to_string()]
            }
        );
        match &report.outcome("root").unwrap().result {
            UnitResult::Blocked { dependencies } => {
                assert!(dependencies.contains(&"memcached".to_string()));
            }
            other => panic!("unexpected result: {other}"),
        }
        assert_eq!(backend.calls(), vec!["install n/redis"]);
        assert_eq!(inspector.list_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_member_fails_package() {
        let backend = MockChartBackend::new();
        backend.fail_install("test-memcached");
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(!report.success());
        assert!(report.outcome("redis").unwrap().result.is_success());
        assert!(matches!(
            report.outcome("memcached").unwrap().result,
            UnitResult::Failed { .. }
        ));
        assert_eq!(
            report.outcome("cache-package").unwrap().result,
            UnitResult::Failed {
                reason: "member charts failed: memcached".to_string()
            }
        );
        // the failed chart is not retried by its package
        assert_eq!(
            backend.calls(),
            vec!["install paas/test-redis", "install paas/test-memcached"]
        );
    }

    #[tokio::test]
    async fn test_gate_timeout_blocks_or_proceeds() {
        let config = OrchestratorConfig {
            wait_for_charts: false,
            ..fast()
        };

        // redis deploys but never becomes ready
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        inspector.script("test-redis", [InstallStatus::NotReady]);
        let report = Orchestrator::new(backend.clone(), inspector.clone())
            .with_config(config.clone())
            .install(&manifest(DEPENDENT), &ctx())
            .await
            .unwrap();

        assert!(report.outcome("redis").unwrap().result.is_success());
        assert_eq!(
            report.outcome("memcached").unwrap().result,
            UnitResult::Blocked {
                dependencies: vec!["redis".to_string()]
            }
        );
        assert!(!backend.is_installed("test-memcached", "paas"));

        let backend = MockChartBackend::new();
        let report = Orchestrator::new(backend.clone(), inspector.clone())
            .with_config(OrchestratorConfig {
                gate_policy: GatePolicy::Proceed,
                ..config
            })
            .install(&manifest(DEPENDENT), &ctx())
            .await
            .unwrap();

        let memcached = report.outcome("memcached").unwrap();
        assert!(memcached.result.is_success());
        assert_eq!(memcached.unmet_dependencies, vec!["redis".to_string()]);
        assert!(backend.is_installed("test-memcached", "paas"));
    }

    #[tokio::test]
    async fn test_post_install_confirmation_times_out() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::always(InstallStatus::NotReady);

        let report = orchestrator(&backend, &inspector)
            .install(&manifest(DEPENDENT), &ctx())
            .await
            .unwrap();

        assert!(matches!(
            report.outcome("redis").unwrap().result,
            UnitResult::Failed { ref reason } if reason.contains("not ready")
        ));
        // never reached the backend: its dependency already failed
        assert!(matches!(
            report.outcome("memcached").unwrap().result,
            UnitResult::Blocked { .. }
        ));
        assert_eq!(backend.operation_counts().installs, 1);
    }

    #[tokio::test]
    async fn test_uninstall_runs_in_reverse_order() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        let orchestrator = orchestrator(&backend, &inspector);
        let manifest = manifest(DEPENDENT);

        assert!(orchestrator.install(&manifest, &ctx()).await.unwrap().success());
        let report = orchestrator.uninstall(&manifest, &ctx()).await.unwrap();

        assert!(report.success());
        assert_eq!(report.operation, Operation::Uninstall);
        assert_eq!(names(&report), vec!["app", "memcached", "redis"]);
        assert_eq!(
            backend.calls()[2..].to_vec(),
            vec!["uninstall paas/test-memcached", "uninstall paas/test-redis"]
        );
    }

    #[tokio::test]
    async fn test_uninstall_package_removes_members_once() {
        let backend = MockChartBackend::with_releases([("test-redis", "paas"), ("test-memcached", "paas")]);
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .uninstall(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(
            names(&report),
            vec!["install-manifest", "cache-package", "memcached", "redis"]
        );
        assert_eq!(
            backend.calls(),
            vec!["uninstall paas/test-memcached", "uninstall paas/test-redis"]
        );
    }

    #[tokio::test]
    async fn test_uninstall_continues_after_failure() {
        let backend = MockChartBackend::with_releases([("test-redis", "paas"), ("test-memcached", "paas")]);
        backend.fail_uninstall("test-memcached");
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .uninstall(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(!report.success());
        assert!(matches!(
            report.outcome("cache-package").unwrap().result,
            UnitResult::Failed { .. }
        ));
        assert!(matches!(
            report.outcome("memcached").unwrap().result,
            UnitResult::Failed { .. }
        ));
        assert!(report.outcome("redis").unwrap().result.is_success());
        assert_eq!(
            backend.calls(),
            vec!["uninstall paas/test-memcached", "uninstall paas/test-redis"]
        );
        assert!(!backend.is_installed("test-redis", "paas"));
        assert!(backend.is_installed("test-memcached", "paas"));
    }

    #[tokio::test]
    async fn test_uninstall_nothing_installed_is_success() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();

        let report = orchestrator(&backend, &inspector)
            .uninstall(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(backend.operation_counts().uninstalls, 0);
    }

    #[tokio::test]
    async fn test_status() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        let orchestrator = orchestrator(&backend, &inspector);
        let manifest = manifest(CACHE);

        let report = orchestrator.status(&manifest, &ctx()).await.unwrap();
        assert_eq!(report.status, InstallStatus::NotInstalled);
        assert_eq!(report.charts.len(), 2);

        orchestrator.install(&manifest, &ctx()).await.unwrap();
        let report = orchestrator.status(&manifest, &ctx()).await.unwrap();
        assert_eq!(report.status, InstallStatus::Ready);

        inspector.script("test-memcached", [InstallStatus::NotReady]);
        let report = orchestrator.status(&manifest, &ctx()).await.unwrap();
        assert_eq!(report.status, InstallStatus::NotReady);
        assert_eq!(report.charts[0].status, InstallStatus::Ready);
        assert_eq!(report.charts[1].release_name, "test-memcached");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator(&backend, &inspector)
            .with_cancellation(cancel)
            .install(&manifest(CACHE), &ctx())
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(!report.success());
        assert!(report.outcomes.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_dependency_wait() {
        let backend = MockChartBackend::new();
        let inspector = MockInspector::new();
        inspector.script("test-redis", [InstallStatus::NotReady]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let report = Orchestrator::new(backend.clone(), inspector)
            .with_config(OrchestratorConfig {
                wait_for_charts: false,
                dependency_timeout: Duration::from_secs(300),
                ..fast()
            })
            .with_cancellation(cancel)
            .install(&manifest(DEPENDENT), &ctx())
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.outcome("memcached").unwrap().result, UnitResult::Cancelled);
        assert_eq!(backend.calls(), vec!["install paas/test-redis"]);
    }
}
