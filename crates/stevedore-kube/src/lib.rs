//! Stevedore Kube - cluster integration and install orchestration
//!
//! This crate provides:
//! - **Chart Backend**: install, uninstall and query releases (`helm` CLI by default)
//! - **Cluster Inspector**: find the workloads a release owns and judge their readiness
//! - **Units**: charts, packages and the manifest root as one closed variant
//! - **Readiness Waiter**: fixed-interval polling with timeout and cancellation
//! - **Orchestrator**: dependency-ordered install, uninstall and status runs
//! - **Mocks**: in-memory backend and inspector for tests

pub mod backend;
pub mod chart;
pub mod error;
pub mod inspector;
pub mod installable;
pub mod manifest;
pub mod mock;
pub mod orchestrator;
pub mod package;
pub mod resources;
pub mod waiter;

pub use backend::{ChartBackend, ChartRequest, HelmCliBackend, ReleaseInfo};
pub use chart::ChartUnit;
pub use error::{KubeError, Result};
pub use inspector::{ClusterInspector, KubeInspector};
pub use installable::Installable;
pub use manifest::Manifest;
pub use mock::{MockChartBackend, MockInspector, OperationCounts};
pub use orchestrator::{
    ChartStatus, GatePolicy, Operation, Orchestrator, OrchestratorConfig, RunReport,
    StatusReport, UnitOutcome, UnitResult,
};
pub use package::PackageUnit;
pub use resources::{ReleaseResources, WorkloadKind, WorkloadReadiness};
pub use waiter::{ReadinessWaiter, WaitOutcome};
