//! Region monitoring
//!
//! Bridges the roster to platform geofence subscriptions and tracks which
//! regions the device is currently inside.
//!
//! # Region lifecycle
//!
//! ```text
//! unmonitored -> monitoring(unknown) -> monitoring(inside | outside) -> unmonitored
//!                        \-> failed (reported, never retried)
//! ```
//!
//! A region returns to unmonitored on resync or when its event is removed.

mod location_service;
mod region;
mod region_monitor;

pub use location_service::LocationService;
pub use region::{AuthorizationStatus, CircularRegion, RegionState, RegionStatus};
pub use region_monitor::{
    InsideSet, MembershipChange, MonitorError, RegionMonitor, ResyncReport, ResyncStrategy,
};
