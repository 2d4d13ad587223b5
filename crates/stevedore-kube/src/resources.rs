//! Workloads owned by a release and their readiness verdict
//!
//! A release is:
//! - `Ready` when every owned workload has reached its desired state
//! - `NotReady` when at least one has not
//! - `NotInstalled` when it owns no workloads at all
//!
//! Per kind:
//! - Deployment, StatefulSet: `readyReplicas >= spec.replicas` (default 1)
//! - DaemonSet: `numberUnavailable == 0`
//! - Job: `succeeded >= spec.completions` (default 1)

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use stevedore_core::InstallStatus;

/// Label Helm 2 era charts put on their workloads
pub const LABEL_RELEASE: &str = "release";

/// Recommended instance label
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";

/// Whether a workload's labels tie it to `release_name`
pub fn belongs_to_release(labels: Option<&BTreeMap<String, String>>, release_name: &str) -> bool {
    labels.is_some_and(|labels| {
        [LABEL_RELEASE, LABEL_INSTANCE]
            .iter()
            .any(|key| labels.get(*key).is_some_and(|v| v == release_name))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
        };
        f.write_str(s)
    }
}

/// Observed versus desired count for one workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadReadiness {
    pub kind: WorkloadKind,
    pub name: String,
    pub observed: i32,
    pub desired: i32,
    pub ready: bool,
}

impl WorkloadReadiness {
    /// Ready when the observed count meets the desired count
    fn counted(kind: WorkloadKind, name: Option<&String>, observed: i32, desired: i32) -> Self {
        Self {
            kind,
            name: name.cloned().unwrap_or_default(),
            observed,
            desired,
            ready: observed >= desired,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

impl fmt::Display for WorkloadReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}/{}", self.kind, self.name, self.observed, self.desired)
    }
}

impl From<&Deployment> for WorkloadReadiness {
    fn from(d: &Deployment) -> Self {
        Self::counted(
            WorkloadKind::Deployment,
            d.metadata.name.as_ref(),
            d.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0),
            d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
        )
    }
}

impl From<&StatefulSet> for WorkloadReadiness {
    fn from(s: &StatefulSet) -> Self {
        Self::counted(
            WorkloadKind::StatefulSet,
            s.metadata.name.as_ref(),
            s.status.as_ref().and_then(|st| st.ready_replicas).unwrap_or(0),
            s.spec.as_ref().and_then(|sp| sp.replicas).unwrap_or(1),
        )
    }
}

impl From<&DaemonSet> for WorkloadReadiness {
    /// Ready once no scheduled pod is unavailable
    fn from(d: &DaemonSet) -> Self {
        let status = d.status.as_ref();
        let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
        let unavailable = status.and_then(|s| s.number_unavailable).unwrap_or(0);
        Self {
            kind: WorkloadKind::DaemonSet,
            name: d.metadata.name.clone().unwrap_or_default(),
            observed: desired - unavailable,
            desired,
            ready: unavailable == 0,
        }
    }
}

impl From<&Job> for WorkloadReadiness {
    fn from(j: &Job) -> Self {
        Self::counted(
            WorkloadKind::Job,
            j.metadata.name.as_ref(),
            j.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0),
            j.spec.as_ref().and_then(|s| s.completions).unwrap_or(1),
        )
    }
}

/// Workloads found in a namespace for one release
#[derive(Debug, Clone, Default)]
pub struct ReleaseResources {
    pub release_name: String,
    pub deployments: Vec<Deployment>,
    pub stateful_sets: Vec<StatefulSet>,
    pub daemon_sets: Vec<DaemonSet>,
    pub jobs: Vec<Job>,
}

impl ReleaseResources {
    pub fn new(release_name: impl Into<String>) -> Self {
        Self {
            release_name: release_name.into(),
            ..Default::default()
        }
    }

    /// Total number of owned workloads
    pub fn len(&self) -> usize {
        self.deployments.len() + self.stateful_sets.len() + self.daemon_sets.len() + self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-workload readiness, in kind order
    pub fn workloads(&self) -> Vec<WorkloadReadiness> {
        self.deployments
            .iter()
            .map(WorkloadReadiness::from)
            .chain(self.stateful_sets.iter().map(WorkloadReadiness::from))
            .chain(self.daemon_sets.iter().map(WorkloadReadiness::from))
            .chain(self.jobs.iter().map(WorkloadReadiness::from))
            .collect()
    }

    /// Readiness verdict for the whole release
    pub fn status(&self) -> InstallStatus {
        let workloads = self.workloads();
        if workloads.is_empty() {
            return InstallStatus::NotInstalled;
        }

        match workloads.iter().find(|w| !w.is_ready()) {
            Some(pending) => {
                tracing::debug!(release = %self.release_name, workload = %pending, "release not ready");
                InstallStatus::NotReady
            }
            None => InstallStatus::Ready,
        }
    }
}
