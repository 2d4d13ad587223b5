//! Chart deploy backend
//!
//! The backend installs, uninstalls and reports on releases. The default
//! implementation drives the `helm` executable; tests use
//! [`MockChartBackend`](crate::mock::MockChartBackend).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use stevedore_core::{InstallStatus, SystemContext, Values};

use crate::error::{KubeError, Result};

/// Everything needed to install or upgrade one release
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub release_name: String,
    pub namespace: String,

    /// Chart reference as declared (`file:` URL, path, `repo/chart` or OCI)
    pub chart_ref: String,

    pub values: Values,

    /// Backend-side operation timeout
    pub timeout: Option<Duration>,
}

/// What the backend reports about a release after an install
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: Option<u32>,
    pub status: String,
    pub notes: Option<String>,
}

#[async_trait]
pub trait ChartBackend: Send + Sync {
    /// Install the release, or upgrade it if it already exists
    async fn install(&self, request: &ChartRequest, ctx: &SystemContext) -> Result<ReleaseInfo>;

    async fn uninstall(&self, release_name: &str, namespace: &str, ctx: &SystemContext)
    -> Result<()>;

    /// Release state as the backend records it
    async fn status(
        &self,
        release_name: &str,
        namespace: &str,
        ctx: &SystemContext,
    ) -> Result<InstallStatus>;
}

/// Turn a chart locator into what the backend accepts
///
/// `file:` URLs become local paths; everything else is passed through as a
/// repository or OCI reference.
pub fn resolve_chart_ref(locator: &str) -> String {
    let locator = locator.trim();
    if let Some(rest) = locator.strip_prefix("file://") {
        // file://host/path is not supported; treat the remainder as a path
        rest.to_string()
    } else if let Some(rest) = locator.strip_prefix("file:") {
        rest.to_string()
    } else {
        locator.to_string()
    }
}

/// Map a Helm release status string onto the three-valued status
pub fn status_from_helm(status: &str) -> InstallStatus {
    match status {
        "deployed" => InstallStatus::Ready,
        "uninstalled" => InstallStatus::NotInstalled,
        _ => InstallStatus::NotReady,
    }
}

/// Backend that shells out to the `helm` executable
#[derive(Debug, Clone)]
pub struct HelmCliBackend {
    binary: String,
}

impl Default for HelmCliBackend {
    fn default() -> Self {
        Self::new("helm")
    }
}

#[derive(Debug, Deserialize)]
struct HelmRelease {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    info: HelmReleaseInfo,
}

#[derive(Debug, Default, Deserialize)]
struct HelmReleaseInfo {
    #[serde(default)]
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

impl From<HelmRelease> for ReleaseInfo {
    fn from(r: HelmRelease) -> Self {
        Self {
            name: r.name,
            namespace: r.namespace,
            revision: r.version,
            status: r.info.status,
            notes: r.info.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

impl HelmCliBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Cluster selection flags taken from the global context
    fn cluster_args(ctx: &SystemContext) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &ctx.global.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.to_string_lossy().into_owned());
        }
        if let Some(context) = &ctx.global.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
        args
    }

    fn values_file(ctx: &SystemContext, request: &ChartRequest) -> PathBuf {
        ctx.work_dir()
            .join(format!("{}-{}.values.yaml", request.namespace, request.release_name))
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        tracing::debug!(binary = %self.binary, args = ?args, "running chart backend");
        tokio::process::Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| KubeError::BackendUnavailable {
                binary: self.binary.clone(),
                source,
            })
    }
}

#[async_trait]
impl ChartBackend for HelmCliBackend {
    async fn install(&self, request: &ChartRequest, ctx: &SystemContext) -> Result<ReleaseInfo> {
        let chart = resolve_chart_ref(&request.chart_ref);
        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            request.release_name.clone(),
            chart.clone(),
            "--namespace".to_string(),
            request.namespace.clone(),
            "--create-namespace".to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];

        if !request.values.is_empty() {
            let path = Self::values_file(ctx, request);
            let yaml = request.values.to_yaml()?;
            tokio::fs::write(&path, yaml)
                .await
                .map_err(|source| KubeError::ScratchWrite {
                    path: path.clone(),
                    source,
                })?;
            args.push("--values".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
        if let Some(timeout) = request.timeout {
            args.push("--timeout".to_string());
            args.push(format!("{}s", timeout.as_secs()));
        }
        args.extend(Self::cluster_args(ctx));

        tracing::info!(
            release = %request.release_name,
            namespace = %request.namespace,
            chart = %chart,
            "installing chart"
        );
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(KubeError::Backend {
                operation: "install".to_string(),
                release: request.release_name.clone(),
                namespace: request.namespace.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let release: HelmRelease = serde_json::from_slice(&output.stdout)?;
        Ok(release.into())
    }

    async fn uninstall(
        &self,
        release_name: &str,
        namespace: &str,
        ctx: &SystemContext,
    ) -> Result<()> {
        let mut args = vec![
            "uninstall".to_string(),
            release_name.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        args.extend(Self::cluster_args(ctx));

        tracing::info!(release = %release_name, namespace = %namespace, "uninstalling chart");
        let output = self.run(&args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(KubeError::Backend {
                operation: "uninstall".to_string(),
                release: release_name.to_string(),
                namespace: namespace.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn status(
        &self,
        release_name: &str,
        namespace: &str,
        ctx: &SystemContext,
    ) -> Result<InstallStatus> {
        let mut args = vec![
            "status".to_string(),
            release_name.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        args.extend(Self::cluster_args(ctx));

        let output = self.run(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not found") {
                return Ok(InstallStatus::NotInstalled);
            }
            return Err(KubeError::Backend {
                operation: "status".to_string(),
                release: release_name.to_string(),
                namespace: namespace.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        let release: HelmRelease = serde_json::from_slice(&output.stdout)?;
        Ok(status_from_helm(&release.info.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use stevedore_core::GlobalContext;

    #[test]
    fn test_resolve_chart_ref() {
        assert_eq!(
            resolve_chart_ref("file:///charts/redis-17.3.7.tgz"),
            "/charts/redis-17.3.7.tgz"
        );
        assert_eq!(resolve_chart_ref("file:charts/redis"), "charts/redis");
        assert_eq!(resolve_chart_ref("bitnami/redis"), "bitnami/redis");
        assert_eq!(
            resolve_chart_ref("oci://registry-1.docker.io/bitnamicharts/memcached"),
            "oci://registry-1.docker.io/bitnamicharts/memcached"
        );
    }

    #[test]
    fn test_status_from_helm() {
        assert_eq!(status_from_helm("deployed"), InstallStatus::Ready);
        assert_eq!(status_from_helm("pending-install"), InstallStatus::NotReady);
        assert_eq!(status_from_helm("failed"), InstallStatus::NotReady);
        assert_eq!(status_from_helm("uninstalled"), InstallStatus::NotInstalled);
    }

    #[test]
    fn test_parse_helm_release_json() {
        let json = r#"{
            "name": "test-redis",
            "namespace": "paas",
            "version": 3,
            "info": {"status": "deployed", "notes": "  "},
            "manifest": "---"
        }"#;
        let release: HelmRelease = serde_json::from_str(json).unwrap();
        let info = ReleaseInfo::from(release);

        assert_eq!(info.name, "test-redis");
        assert_eq!(info.revision, Some(3));
        assert_eq!(info.status, "deployed");
        assert_eq!(info.notes, None);
    }

    #[test]
    fn test_cluster_args() {
        let global = GlobalContext {
            kubeconfig: Some(PathBuf::from("/home/ops/.kube/staging")),
            kube_context: Some("staging".to_string()),
            ..Default::default()
        };
        let ctx = SystemContext::new("m", "/tmp/work", Arc::new(global));

        assert_eq!(
            HelmCliBackend::cluster_args(&ctx),
            vec![
                "--kubeconfig",
                "/home/ops/.kube/staging",
                "--kube-context",
                "staging"
            ]
        );
    }

    #[test]
    fn test_values_file_in_work_dir() {
        let ctx = SystemContext::new("m", "/tmp/work", Arc::new(GlobalContext::default()));
        let request = ChartRequest {
            release_name: "test-redis".into(),
            namespace: "paas".into(),
            chart_ref: "bitnami/redis".into(),
            values: Values::new(),
            timeout: None,
        };
        assert_eq!(
            HelmCliBackend::values_file(&ctx, &request),
            Path::new("/tmp/work/paas-test-redis.values.yaml")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let backend = HelmCliBackend::new("stevedore-no-such-helm-binary");
        let ctx = SystemContext::new("m", "/tmp", Arc::new(GlobalContext::default()));

        let err = backend.status("r", "ns", &ctx).await.unwrap_err();
        assert!(matches!(err, KubeError::BackendUnavailable { .. }));
        assert!(err.is_fatal());
    }
}
