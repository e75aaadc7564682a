//! Geofence roster synchronization core.
//!
//! Keeps a local roster of [`EventLocation`]s consistent with a remote
//! document store, turns the roster into a bounded set of platform region
//! subscriptions, and tracks which regions the device is currently inside.
//!
//! - [`store`]: the remote store client seam and an in-memory implementation
//! - [`roster`]: the authoritative in-memory roster
//! - [`monitor`]: region subscriptions and inside/outside membership
//! - [`sync`]: the controller that serializes every mutation through one worker

pub mod event_location;
pub mod monitor;
pub mod roster;
pub mod store;
pub mod sync;

pub mod prelude {
    pub use crate::event_location::{Coordinate, EventLocation, ValidationError};
    pub use crate::monitor::{
        AuthorizationStatus, CircularRegion, LocationService, RegionState, ResyncStrategy,
    };
    pub use crate::roster::{EventRoster, RosterView};
    pub use crate::store::{MemoryRemoteStore, RemoteStore, StoreError, Subscription};
    pub use crate::sync::{
        LocationEventSink, RefreshOutcome, SyncConfig, SyncController, SyncError, SyncEvent,
    };
}

pub use event_location::{Coordinate, EventLocation};
