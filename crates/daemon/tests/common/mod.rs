//! Shared helpers for daemon integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use ::common::prelude::*;
use ::common::sync::SyncEvent;
use tokio::sync::broadcast;

pub const COLLECTION: &str = "eventLocations";

/// In-process document server speaking the collection REST protocol
#[derive(Clone, Default)]
pub struct DocumentServer {
    pub documents: Arc<Mutex<Vec<Value>>>,
}

impl DocumentServer {
    pub fn insert(&self, document: Value) {
        let mut documents = self.documents.lock();
        let id = document.get("id").cloned();
        documents.retain(|d| id.is_none() || d.get("id") != id.as_ref());
        documents.push(document);
    }

    pub fn ids(&self) -> Vec<String> {
        self.documents
            .lock()
            .iter()
            .filter_map(|d| d.get("id").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Serve on an ephemeral port, returning the base url
    pub async fn spawn(&self) -> Url {
        let app = Router::new()
            .route("/api/:collection", get(list_documents))
            .route(
                "/api/:collection/:id",
                put(put_document).delete(delete_document),
            )
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/api/")).unwrap()
    }
}

async fn list_documents(
    State(server): State<DocumentServer>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    if collection != COLLECTION {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(server.documents.lock().clone()))
}

async fn put_document(
    State(server): State<DocumentServer>,
    Path((_collection, id)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> StatusCode {
    if document.get("id").and_then(Value::as_str) != Some(id.as_str()) {
        return StatusCode::BAD_REQUEST;
    }
    server.insert(document);
    StatusCode::NO_CONTENT
}

async fn delete_document(
    State(server): State<DocumentServer>,
    Path((_collection, id)): Path<(String, String)>,
) -> StatusCode {
    let mut documents = server.documents.lock();
    let before = documents.len();
    documents.retain(|d| d.get("id").and_then(Value::as_str) != Some(id.as_str()));
    if documents.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

pub fn event_at(id: &str, latitude: f64, longitude: f64, radius: f64) -> EventLocation {
    EventLocation::with_id(
        id,
        Coordinate::new(latitude, longitude),
        radius,
        id,
        Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap(),
    )
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn wait_for<F>(rx: &mut broadcast::Receiver<SyncEvent>, mut pred: F) -> SyncEvent
where
    F: FnMut(&SyncEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for sync event")
}
