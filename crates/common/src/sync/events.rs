//! Observer notifications
//!
//! The worker publishes a [`SyncEvent`] for every observable change. Any
//! number of observers can follow along through [`EventBus::subscribe`].

use tokio::sync::broadcast;

use crate::monitor::AuthorizationStatus;

/// Where a roster snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// An explicit `refresh()`
    Refresh,
    /// The remote store's change feed
    Push,
}

impl std::fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotOrigin::Refresh => write!(f, "refresh"),
            SnapshotOrigin::Push => write!(f, "push"),
        }
    }
}

/// Events emitted by the sync worker
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The roster was replaced wholesale
    RosterReplaced {
        generation: u64,
        origin: SnapshotOrigin,
        count: usize,
    },
    /// A snapshot arrived after newer state had already been applied
    SnapshotSuperseded { generation: u64, applied: u64 },
    /// An event was deleted from the remote store by this client
    EventRemoved { id: String },
    RegionEntered { region_id: String },
    RegionExited { region_id: String },
    /// The inside-set became empty or non-empty
    CheckInAvailabilityChanged { available: bool },
    MonitoringFailed { region_id: String, reason: String },
    MonitoringUnavailable,
    /// Authorization is below what region monitoring needs. Monitoring is
    /// still attempted.
    AuthorizationWarning { status: AuthorizationStatus },
    /// The remote change feed reported an error
    RemoteError { message: String },
}

/// Fan-out channel for [`SyncEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber. Dropped silently when nobody listens.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}
