use std::fmt::Debug;

use super::region::{AuthorizationStatus, CircularRegion};

/// The platform's geofencing service
///
/// Calls are fire-and-forget: the platform reports region state, failures
/// and authorization changes later through a
/// [`LocationEventSink`](crate::sync::LocationEventSink), from whatever
/// context it likes.
pub trait LocationService: Send + Sync + Debug + 'static {
    /// Whether the device can monitor circular regions at all
    fn is_monitoring_available(&self) -> bool;

    fn authorization_status(&self) -> AuthorizationStatus;

    /// Largest radius in meters the platform will monitor
    fn maximum_monitoring_distance(&self) -> f64;

    /// Identifiers of every region the platform is currently monitoring
    fn monitored_regions(&self) -> Vec<String>;

    fn start_monitoring(&self, region: &CircularRegion);

    fn stop_monitoring(&self, region_id: &str);
}
