//! In-memory backend and inspector for testing
//!
//! Neither touches a cluster. The backend records every call and keeps the
//! set of installed releases; the inspector replays scripted readiness so
//! waits and gates can be exercised deterministically.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stevedore_core::{InstallStatus, SystemContext};

use crate::backend::{ChartBackend, ChartRequest, ReleaseInfo};
use crate::error::{KubeError, Result};
use crate::inspector::ClusterInspector;
use crate::resources::ReleaseResources;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, release_name: &str) -> String {
    format!("{}/{}", namespace, release_name)
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub installs: usize,
    pub uninstalls: usize,
    pub statuses: usize,
}

#[derive(Default)]
struct BackendState {
    releases: HashMap<String, ChartRequest>,
    revisions: HashMap<String, u32>,
    failing_installs: HashSet<String>,
    failing_uninstalls: HashSet<String>,
    calls: Vec<String>,
    counts: OperationCounts,
}

/// In-memory chart backend
#[derive(Clone, Default)]
pub struct MockChartBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockChartBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with releases already installed, as `(release, namespace)`
    pub fn with_releases<'a>(releases: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let backend = Self::new();
        {
            let mut state = lock(&backend.state);
            for (release, namespace) in releases {
                state.releases.insert(
                    key(namespace, release),
                    ChartRequest {
                        release_name: release.to_string(),
                        namespace: namespace.to_string(),
                        chart_ref: String::new(),
                        values: Default::default(),
                        timeout: None,
                    },
                );
            }
        }
        backend
    }

    /// Make every install of `release_name` fail
    pub fn fail_install(&self, release_name: &str) {
        lock(&self.state)
            .failing_installs
            .insert(release_name.to_string());
    }

    /// Make every uninstall of `release_name` fail
    pub fn fail_uninstall(&self, release_name: &str) {
        lock(&self.state)
            .failing_uninstalls
            .insert(release_name.to_string());
    }

    pub fn operation_counts(&self) -> OperationCounts {
        lock(&self.state).counts.clone()
    }

    /// Install and uninstall calls in order, as `"install ns/release"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn is_installed(&self, release_name: &str, namespace: &str) -> bool {
        lock(&self.state)
            .releases
            .contains_key(&key(namespace, release_name))
    }

    /// The request a release was last installed with
    pub fn installed_request(&self, release_name: &str, namespace: &str) -> Option<ChartRequest> {
        lock(&self.state)
            .releases
            .get(&key(namespace, release_name))
            .cloned()
    }
}

#[async_trait]
impl ChartBackend for MockChartBackend {
    async fn install(&self, request: &ChartRequest, _ctx: &SystemContext) -> Result<ReleaseInfo> {
        let mut state = lock(&self.state);
        let id = key(&request.namespace, &request.release_name);
        state.counts.installs += 1;
        state.calls.push(format!("install {}", id));

        if state.failing_installs.contains(&request.release_name) {
            return Err(KubeError::Backend {
                operation: "install".to_string(),
                release: request.release_name.clone(),
                namespace: request.namespace.clone(),
                message: "injected failure".to_string(),
            });
        }

        let revision = {
            let r = state.revisions.entry(id.clone()).or_insert(0);
            *r += 1;
            *r
        };
        state.releases.insert(id, request.clone());

        Ok(ReleaseInfo {
            name: request.release_name.clone(),
            namespace: request.namespace.clone(),
            revision: Some(revision),
            status: "deployed".to_string(),
            notes: None,
        })
    }

    async fn uninstall(
        &self,
        release_name: &str,
        namespace: &str,
        _ctx: &SystemContext,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        let id = key(namespace, release_name);
        state.counts.uninstalls += 1;
        state.calls.push(format!("uninstall {}", id));

        if state.failing_uninstalls.contains(release_name) {
            return Err(KubeError::Backend {
                operation: "uninstall".to_string(),
                release: release_name.to_string(),
                namespace: namespace.to_string(),
                message: "injected failure".to_string(),
            });
        }
        state.releases.remove(&id);
        Ok(())
    }

    async fn status(
        &self,
        release_name: &str,
        namespace: &str,
        _ctx: &SystemContext,
    ) -> Result<InstallStatus> {
        let mut state = lock(&self.state);
        state.counts.statuses += 1;
        if state.releases.contains_key(&key(namespace, release_name)) {
            Ok(InstallStatus::Ready)
        } else {
            Ok(InstallStatus::NotInstalled)
        }
    }
}

#[derive(Default)]
struct InspectorState {
    scripts: HashMap<String, VecDeque<InstallStatus>>,
    fallback: Option<InstallStatus>,
    failing: HashSet<String>,
    lists: usize,
}

/// In-memory cluster inspector with scripted readiness
#[derive(Clone, Default)]
pub struct MockInspector {
    state: Arc<Mutex<InspectorState>>,
}

impl MockInspector {
    /// Unscripted releases own no workloads
    pub fn new() -> Self {
        Self::default()
    }

    /// Unscripted releases own one ready workload
    pub fn ready_by_default() -> Self {
        let inspector = Self::new();
        lock(&inspector.state).fallback = Some(InstallStatus::Ready);
        inspector
    }

    /// Unscripted releases always report `status`
    pub fn always(status: InstallStatus) -> Self {
        let inspector = Self::new();
        lock(&inspector.state).fallback = Some(status);
        inspector
    }

    /// Statuses reported by successive polls of `release_name`
    ///
    /// The last entry repeats once the script is exhausted.
    pub fn script(&self, release_name: &str, statuses: impl IntoIterator<Item = InstallStatus>) {
        lock(&self.state)
            .scripts
            .insert(release_name.to_string(), statuses.into_iter().collect());
    }

    /// Make listing `release_name` return an API error
    pub fn fail(&self, release_name: &str) {
        lock(&self.state).failing.insert(release_name.to_string());
    }

    pub fn list_count(&self) -> usize {
        lock(&self.state).lists
    }

    fn next_status(state: &mut InspectorState, release_name: &str) -> InstallStatus {
        match state.scripts.get_mut(release_name) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or(InstallStatus::NotInstalled),
            Some(script) => script.front().copied().unwrap_or(InstallStatus::NotInstalled),
            None => state.fallback.unwrap_or(InstallStatus::NotInstalled),
        }
    }
}

/// One deployment whose readiness matches `status`
fn resources_for(release_name: &str, status: InstallStatus) -> ReleaseResources {
    let mut rr = ReleaseResources::new(release_name);
    let ready = match status {
        InstallStatus::NotInstalled => return rr,
        InstallStatus::Ready => 1,
        InstallStatus::NotReady => 0,
    };
    rr.deployments.push(Deployment {
        metadata: ObjectMeta {
            name: Some(release_name.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            ready_replicas: Some(ready),
            ..Default::default()
        }),
    });
    rr
}

#[async_trait]
impl ClusterInspector for MockInspector {
    async fn list_workloads_for_release(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> Result<ReleaseResources> {
        let mut state = lock(&self.state);
        state.lists += 1;

        if state.failing.contains(release_name) {
            return Err(KubeError::Backend {
                operation: "list".to_string(),
                release: release_name.to_string(),
                namespace: namespace.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let status = Self::next_status(&mut state, release_name);
        Ok(resources_for(release_name, status))
    }
}
