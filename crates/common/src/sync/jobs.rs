//! Job queue feeding the sync worker
//!
//! Everything that touches the roster, the region subscriptions or the
//! inside-set becomes a [`SyncJob`] on an unbounded flume channel. The
//! single [`SyncWorker`](super::SyncWorker) drains it in order, which makes
//! the queue the one serialization point for all mutable state.

use tokio::sync::oneshot;

use crate::event_location::EventLocation;
use crate::monitor::{AuthorizationStatus, RegionState};

use super::controller::RefreshOutcome;
use super::error::SyncError;
use super::events::SnapshotOrigin;

pub type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

/// Work for the sync worker
#[derive(Debug)]
pub enum SyncJob {
    /// Replace the roster with a full collection snapshot and resync regions
    ApplySnapshot {
        generation: u64,
        origin: SnapshotOrigin,
        records: Vec<EventLocation>,
        reply: Option<Reply<RefreshOutcome>>,
    },
    /// An event was deleted remotely by us; drop it locally right away
    RemoveEvent {
        generation: u64,
        id: String,
        reply: Reply<()>,
    },
    /// Platform callback: the device is inside/outside a region
    StateDetermined { region_id: String, state: RegionState },
    /// Platform callback: a region subscription failed
    MonitoringFailed { region_id: String, reason: String },
    /// Platform callback: location permission changed
    AuthorizationChanged { status: AuthorizationStatus },
    /// The remote change feed reported an error
    RemoteError { message: String },
    /// Look up the current state of one region
    QueryRegion {
        region_id: String,
        reply: Reply<Option<RegionState>>,
    },
    /// Answered once every job queued before it has been handled
    Settle { reply: oneshot::Sender<()> },
}

/// Cloneable handle for queueing jobs
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    tx: flume::Sender<SyncJob>,
}

impl JobDispatcher {
    /// Create a new job dispatcher and receiver pair
    ///
    /// The dispatcher can be cloned and shared, while the receiver belongs
    /// to the worker task.
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, JobReceiver { rx })
    }

    /// Queue a job. Only fails once the worker has gone away.
    pub fn dispatch(&self, job: SyncJob) -> Result<(), SyncError> {
        self.tx.send(job).map_err(|_| SyncError::WorkerClosed)
    }
}

/// Receiving end of the job queue, owned by the worker
#[derive(Debug)]
pub struct JobReceiver {
    rx: flume::Receiver<SyncJob>,
}

impl JobReceiver {
    /// Wait for the next job
    ///
    /// Returns None when all dispatchers have been dropped.
    pub async fn recv_async(&self) -> Option<SyncJob> {
        self.rx.recv_async().await.ok()
    }

    /// Try to receive a job without waiting
    pub fn try_recv(&self) -> Option<SyncJob> {
        self.rx.try_recv().ok()
    }
}

/// Entry point for platform location callbacks
///
/// Safe to call from any thread or task: each callback is queued for the
/// sync worker instead of touching state directly.
#[derive(Debug, Clone)]
pub struct LocationEventSink {
    jobs: JobDispatcher,
}

impl LocationEventSink {
    pub(crate) fn new(jobs: JobDispatcher) -> Self {
        Self { jobs }
    }

    pub fn did_determine_state(&self, region_id: impl Into<String>, state: RegionState) {
        self.send(SyncJob::StateDetermined {
            region_id: region_id.into(),
            state,
        });
    }

    pub fn monitoring_did_fail(&self, region_id: impl Into<String>, reason: impl Into<String>) {
        self.send(SyncJob::MonitoringFailed {
            region_id: region_id.into(),
            reason: reason.into(),
        });
    }

    pub fn did_change_authorization(&self, status: AuthorizationStatus) {
        self.send(SyncJob::AuthorizationChanged { status });
    }

    fn send(&self, job: SyncJob) {
        if self.jobs.dispatch(job).is_err() {
            tracing::debug!("Dropping location callback, sync worker has shut down");
        }
    }
}
