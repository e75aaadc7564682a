//! Geofenced event definitions
//!
//! An [`EventLocation`] is a circular area with an active time window. Records
//! are never edited in place: an update is a whole-record replacement keyed by
//! [`EventLocation::id`].

mod document;

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use document::{decode_documents, EventDocument, ValidationError};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

const DEG_TO_RAD: f64 = PI / 180.0;

/// Label shown for events created without a name.
pub const UNNAMED_EVENT_TITLE: &str = "No Note";

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters (haversine on a spherical earth).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lat2 = other.latitude * DEG_TO_RAD;
        let d_lat = (other.latitude - self.latitude) * DEG_TO_RAD;
        let d_lon = (other.longitude - self.longitude) * DEG_TO_RAD;

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A geofenced event definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    /// Client-assigned unique identifier, also the region identity
    pub id: String,
    pub coordinate: Coordinate,
    /// Radius in meters
    pub radius: f64,
    /// Freeform label, see [`EventLocation::title`]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl EventLocation {
    /// Create a new event with a freshly generated id
    pub fn new(
        coordinate: Coordinate,
        radius: f64,
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            coordinate,
            radius,
            name,
            start_time,
            end_time,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        coordinate: Coordinate,
        radius: f64,
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            coordinate,
            radius,
            name: name.into(),
            start_time,
            end_time,
        }
    }

    /// Display label; empty names read as "No Note"
    pub fn title(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED_EVENT_TITLE
        } else {
            &self.name
        }
    }

    /// Whether `now` lies strictly inside the event window. Both boundary
    /// instants are excluded.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time < now && now < self.end_time
    }

    /// Copy of this record with its radius clamped to `max_distance`
    pub fn clamped(&self, max_distance: f64) -> Self {
        Self {
            radius: clamp_radius(self.radius, max_distance),
            ..self.clone()
        }
    }

    /// Reject values no platform can monitor. This is the only check applied
    /// to locally created records; remote documents are checked by decoding.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if !self.coordinate.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "coordinate",
                reason: "coordinate must be finite".to_string(),
            });
        }
        if self.radius.is_nan() {
            return Err(ValidationError::InvalidValue {
                field: "radius",
                reason: "radius must be a number".to_string(),
            });
        }
        Ok(())
    }
}

/// Clamp a requested radius into `[0, max_distance]`.
///
/// NaN collapses to zero so the result is always a valid monitoring distance.
pub fn clamp_radius(radius: f64, max_distance: f64) -> f64 {
    let max_distance = if max_distance.is_nan() {
        0.0
    } else {
        max_distance.max(0.0)
    };
    if radius.is_nan() {
        return 0.0;
    }
    radius.max(0.0).min(max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(name: &str) -> EventLocation {
        EventLocation::with_id("a", Coordinate::new(0.0, 0.0), 100.0, name, t(0), t(60))
    }

    #[test]
    fn test_title_falls_back_for_empty_name() {
        assert_eq!(event("").title(), "No Note");
        assert_eq!(event("Standup").title(), "Standup");
    }

    #[test]
    fn test_active_window_excludes_boundaries() {
        let e = event("E1");
        assert!(!e.is_active_at(t(0)));
        assert!(e.is_active_at(t(1)));
        assert!(e.is_active_at(t(59)));
        assert!(!e.is_active_at(t(60)));
        assert!(!e.is_active_at(t(0) - Duration::seconds(1)));
    }

    #[test]
    fn test_inverted_window_is_never_active() {
        let e = EventLocation::with_id("b", Coordinate::new(0.0, 0.0), 1.0, "", t(60), t(0));
        assert!(!e.is_active_at(t(30)));
    }

    #[test]
    fn test_clamp_radius() {
        assert_eq!(clamp_radius(5000.0, 1000.0), 1000.0);
        assert_eq!(clamp_radius(250.0, 1000.0), 250.0);
        assert_eq!(clamp_radius(-10.0, 1000.0), 0.0);
        assert_eq!(clamp_radius(f64::NAN, 1000.0), 0.0);
        assert_eq!(clamp_radius(f64::INFINITY, 1000.0), 1000.0);
        assert_eq!(clamp_radius(10.0, -5.0), 0.0);
    }

    #[test]
    fn test_clamped_keeps_identity() {
        let mut e = event("E1");
        e.radius = 5000.0;
        let clamped = e.clamped(1000.0);
        assert_eq!(clamped.radius, 1000.0);
        assert_eq!(clamped.id, e.id);
        assert_eq!(clamped.name, e.name);
    }

    #[test]
    fn test_new_assigns_unique_ids() {
        let a = EventLocation::new(Coordinate::new(0.0, 0.0), 1.0, "", t(0), t(1));
        let b = EventLocation::new(Coordinate::new(0.0, 0.0), 1.0, "", t(0), t(1));
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_distance_to() {
        let origin = Coordinate::new(0.0, 0.0);
        assert_eq!(origin.distance_to(&origin), 0.0);

        // one degree of longitude at the equator is ~111.2km
        let east = Coordinate::new(0.0, 1.0);
        let d = origin.distance_to(&east);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_validate_rejects_non_finite_coordinate() {
        let mut e = event("E1");
        e.coordinate.latitude = f64::NAN;
        assert!(matches!(
            e.validate(),
            Err(ValidationError::InvalidValue {
                field: "coordinate",
                ..
            })
        ));
    }
}
