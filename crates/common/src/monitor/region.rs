use serde::{Deserialize, Serialize};

use crate::event_location::{clamp_radius, Coordinate, EventLocation};

/// A circular area handed to the platform for monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularRegion {
    /// Same as the source event's id
    pub id: String,
    pub center: Coordinate,
    /// Meters, already clamped to the platform maximum
    pub radius: f64,
}

impl CircularRegion {
    pub fn from_event(event: &EventLocation, max_distance: f64) -> Self {
        Self {
            id: event.id.clone(),
            center: event.coordinate,
            radius: clamp_radius(event.radius, max_distance),
        }
    }

    /// Whether `position` falls within the region, boundary included
    pub fn contains(&self, position: &Coordinate) -> bool {
        self.center.distance_to(position) <= self.radius
    }
}

/// Device state relative to a region, as determined by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionState {
    Inside,
    Outside,
    Unknown,
}

impl std::fmt::Display for RegionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionState::Inside => write!(f, "inside"),
            RegionState::Outside => write!(f, "outside"),
            RegionState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lifecycle status of a region this process asked the platform to monitor
#[derive(Debug, Clone, PartialEq)]
pub enum RegionStatus {
    /// Subscribed; `Unknown` until the platform reports its first determination
    Monitoring(RegionState),
    /// The platform gave up on the subscription
    Failed { reason: String },
}

/// Location permission granted to the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Restricted,
    Denied,
    WhenInUse,
    Always,
}

impl AuthorizationStatus {
    /// Region monitoring only runs reliably with background ("always") access
    pub fn permits_monitoring(&self) -> bool {
        matches!(self, AuthorizationStatus::Always)
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::WhenInUse => "when_in_use",
            AuthorizationStatus::Always => "always",
        };
        write!(f, "{}", s)
    }
}
