//! Three-valued readiness status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed install status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallStatus {
    /// Resources exist but have not reached their desired state
    NotReady,
    /// Every owned workload is at its desired state
    Ready,
    /// No owned workloads exist
    NotInstalled,
}

impl InstallStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Aggregate the statuses of several units.
    ///
    /// Ready iff all are Ready, NotInstalled iff all are NotInstalled,
    /// NotReady otherwise. An empty set is Ready.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = InstallStatus>,
    {
        let mut all_ready = true;
        let mut all_missing = true;
        let mut seen = false;

        for status in statuses {
            seen = true;
            all_ready &= status == Self::Ready;
            all_missing &= status == Self::NotInstalled;
        }

        if !seen || all_ready {
            Self::Ready
        } else if all_missing {
            Self::NotInstalled
        } else {
            Self::NotReady
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotReady => "not-ready",
            Self::Ready => "ready",
            Self::NotInstalled => "not-installed",
        };
        f.write_str(s)
    }
}
