//! Readiness polling
//!
//! A wait polls a status source at a fixed interval (no backoff) until it
//! reports [`InstallStatus::Ready`], the deadline passes, or the run is
//! cancelled. Timing out is an outcome, not an error.

use std::future::Future;
use std::time::Duration;
use stevedore_core::InstallStatus;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Interval between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long a unit waits on each of its direct dependencies
pub const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a freshly installed chart gets to become ready
pub const DEFAULT_CHART_READY_TIMEOUT: Duration = Duration::from_secs(8 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Polls a status source until it is ready
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl ReadinessWaiter {
    pub fn new(poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            poll_interval,
            cancel,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll `probe` until it reports Ready or `timeout` elapses
    ///
    /// The probe always runs at least once, so a zero timeout is a single
    /// check.
    pub async fn wait_until<F, Fut>(&self, label: &str, timeout: Duration, mut probe: F) -> WaitOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InstallStatus>,
    {
        let deadline = Instant::now() + timeout;
        let mut polls = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }

            let status = probe().await;
            polls += 1;
            tracing::debug!(unit = %label, %status, polls, "polled readiness");
            if status.is_ready() {
                return WaitOutcome::Ready;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(unit = %label, timeout = ?timeout, polls, "timed out waiting for readiness");
                return WaitOutcome::TimedOut;
            }

            let pause = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = self.cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Boolean form of [`wait_until`](Self::wait_until)
    pub async fn await_ready<F, Fut>(&self, label: &str, timeout: Duration, probe: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InstallStatus>,
    {
        self.wait_until(label, timeout, probe).await.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_never_ready_times_out() {
        let waiter = ReadinessWaiter::new(Duration::from_millis(100), CancellationToken::new());
        let start = std::time::Instant::now();

        let ready = waiter
            .await_ready("stuck", Duration::from_secs(1), || async { InstallStatus::NotReady })
            .await;
        let elapsed = start.elapsed();

        assert!(!ready);
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_ready_after_a_few_polls() {
        let waiter = ReadinessWaiter::new(Duration::from_millis(10), CancellationToken::new());
        let polls = Arc::new(AtomicU32::new(0));

        let counter = polls.clone();
        let outcome = waiter
            .wait_until("redis", Duration::from_secs(5), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n >= 2 {
                        InstallStatus::Ready
                    } else {
                        InstallStatus::NotInstalled
                    }
                }
            })
            .await;

        assert_eq!(outcome, WaitOutcome::Ready);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let waiter = ReadinessWaiter::new(Duration::from_secs(60), CancellationToken::new());
        let polls = Arc::new(AtomicU32::new(0));

        let counter = polls.clone();
        let outcome = waiter
            .wait_until("redis", Duration::ZERO, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { InstallStatus::NotReady }
            })
            .await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let waiter = ReadinessWaiter::new(Duration::from_secs(60), cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let outcome = waiter
            .wait_until("stuck", Duration::from_secs(300), || async { InstallStatus::NotReady })
            .await;

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
