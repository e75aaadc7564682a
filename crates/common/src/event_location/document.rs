//! Remote document format for event locations
//!
//! The remote collection stores one JSON document per event:
//!
//! ```json
//! {
//!   "id": "5D0F…",
//!   "name": "Standup",
//!   "radius": 100.0,
//!   "coordinate": { "latitude": 37.33, "longitude": -122.03 },
//!   "startTime": "2024-01-04T09:00:00Z",
//!   "endTime": "2024-01-04T10:00:00Z"
//! }
//! ```
//!
//! Documents that fail to decode are dropped from listings rather than
//! failing the whole fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinate, EventLocation};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Wire representation of an [`EventLocation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDocument {
    pub id: String,
    pub name: String,
    pub radius: f64,
    pub coordinate: Coordinate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl EventDocument {
    /// Decode a raw document, failing on any missing or mistyped field
    pub fn decode(value: serde_json::Value) -> Result<EventLocation, ValidationError> {
        let document: EventDocument = serde_json::from_value(value)?;
        if document.id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        Ok(document.into())
    }

    pub fn encode(event: &EventLocation) -> serde_json::Value {
        // a struct of strings, floats and RFC 3339 timestamps always serializes
        serde_json::to_value(EventDocument::from(event)).unwrap_or(serde_json::Value::Null)
    }
}

impl From<EventDocument> for EventLocation {
    fn from(document: EventDocument) -> Self {
        EventLocation {
            id: document.id,
            coordinate: document.coordinate,
            radius: document.radius,
            name: document.name,
            start_time: document.start_time,
            end_time: document.end_time,
        }
    }
}

impl From<&EventLocation> for EventDocument {
    fn from(event: &EventLocation) -> Self {
        EventDocument {
            id: event.id.clone(),
            name: event.name.clone(),
            radius: event.radius,
            coordinate: event.coordinate,
            start_time: event.start_time,
            end_time: event.end_time,
        }
    }
}

/// Decode a collection listing, silently skipping malformed documents
pub fn decode_documents<I>(documents: I) -> Vec<EventLocation>
where
    I: IntoIterator<Item = serde_json::Value>,
{
    let mut events = Vec::new();
    let mut dropped = 0usize;
    for document in documents {
        match EventDocument::decode(document) {
            Ok(event) => events.push(event),
            Err(e) => {
                dropped += 1;
                tracing::debug!("Dropping malformed event document: {}", e);
            }
        }
    }
    if dropped > 0 {
        tracing::debug!(
            "Decoded {} event documents, dropped {} malformed",
            events.len(),
            dropped
        );
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Standup",
            "radius": 100.0,
            "coordinate": { "latitude": 37.33, "longitude": -122.03 },
            "startTime": "2024-01-04T09:00:00Z",
            "endTime": "2024-01-04T10:00:00Z"
        })
    }

    #[test]
    fn test_decode_valid_document() {
        let event = EventDocument::decode(valid("a")).unwrap();
        assert_eq!(event.id, "a");
        assert_eq!(event.name, "Standup");
        assert_eq!(event.radius, 100.0);
        assert_eq!(event.coordinate, Coordinate::new(37.33, -122.03));
        assert!(event.start_time < event.end_time);
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let mut doc = valid("a");
        doc.as_object_mut().unwrap().remove("endTime");
        assert!(matches!(
            EventDocument::decode(doc),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let mut doc = valid("a");
        doc["radius"] = json!("wide");
        assert!(EventDocument::decode(doc).is_err());
    }

    #[test]
    fn test_decode_empty_id_fails() {
        assert!(matches!(
            EventDocument::decode(valid("")),
            Err(ValidationError::MissingField("id"))
        ));
    }

    #[test]
    fn test_decode_documents_skips_malformed() {
        let docs = vec![
            valid("a"),
            json!({ "id": "broken" }),
            json!("not an object"),
            valid("b"),
        ];
        let events = decode_documents(docs);
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_encode_uses_document_field_names() {
        let event = EventDocument::decode(valid("a")).unwrap();
        let encoded = EventDocument::encode(&event);
        assert_eq!(encoded["startTime"], "2024-01-04T09:00:00Z");
        assert_eq!(encoded["coordinate"]["latitude"], 37.33);
        assert_eq!(EventDocument::decode(encoded).unwrap(), event);
    }
}
