use serde::{Deserialize, Serialize};

use crate::monitor::ResyncStrategy;

/// Default cap on the number of events the roster may hold
pub const DEFAULT_MAX_EVENTS: usize = 20;

/// Default buffer for the observer broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tuning for a [`SyncController`](super::SyncController)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Adds are refused once the roster holds this many events
    pub max_events: usize,
    pub resync_strategy: ResyncStrategy,
    /// Observers lagging more than this many events miss the oldest ones
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            resync_strategy: ResyncStrategy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
