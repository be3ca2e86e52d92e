//! The [`Worker`] capability and its handle (C7, §9 redesign notes).
//!
//! Each worker is a long-lived task on the Tokio runtime rather than a
//! subclass of some base "worker" type — the Supervisor holds a
//! homogeneous map of [`WorkerHandle`]s and never downcasts. Cancellation
//! is explicit: every suspension point in a worker's loop races against
//! the shared [`CancellationToken`], so `stop()` interrupts the next sleep
//! or await rather than aborting a signature mid-flight (§5 Cancellation).

use async_trait::async_trait;
use strategyd_core::{StrategyId, StrategyKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[async_trait]
pub trait Worker: Send + 'static {
    fn strategy_id(&self) -> &StrategyId;

    fn kind(&self) -> StrategyKind;

    /// Runs until `cancel` is triggered or the worker completes on its own
    /// (e.g. a one-shot PriceMonitor firing). Must never let an error
    /// escape — internal failures are logged and the loop continues to
    /// its next tick, per §7's propagation policy.
    async fn run(self: Box<Self>, cancel: CancellationToken);
}

/// A live worker's handle, held by the Supervisor. Dropping it without
/// calling [`WorkerHandle::stop`] leaks the task; the Supervisor always
/// stops a handle before discarding it.
pub struct WorkerHandle {
    pub strategy_id: StrategyId,
    pub kind: StrategyKind,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals cancellation and waits for the task to observe it and
    /// exit. In-flight swap attempts run to natural completion first —
    /// the worker only checks `cancel` at its own suspension points.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            if e.is_panic() {
                warn!(strategy_id = %self.strategy_id, "worker task panicked during shutdown");
            }
        }
        debug!(strategy_id = %self.strategy_id, "worker stopped");
    }
}

/// Spawns `worker` as an independent task and returns a handle to it.
pub fn spawn(worker: Box<dyn Worker>) -> WorkerHandle {
    let strategy_id = worker.strategy_id().clone();
    let kind = worker.kind();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let join = tokio::spawn(async move {
        worker.run(token).await;
    });
    WorkerHandle {
        strategy_id,
        kind,
        cancel,
        join,
    }
}

/// Sleeps for `duration`, returning early (without completing the sleep)
/// if `cancel` fires first. Returns `true` if the sleep ran to completion,
/// `false` if cancellation interrupted it — callers use this to break out
/// of their loop without an extra interleaved cancellation check.
pub async fn sleep_or_cancelled(duration: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}
