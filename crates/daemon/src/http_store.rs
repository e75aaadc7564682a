//! Remote store client speaking JSON over HTTP
//!
//! The collection is exposed as a REST resource:
//!
//! - `GET {url}/{collection}` returns a JSON array of event documents
//! - `PUT {url}/{collection}/{id}` upserts one document
//! - `DELETE {url}/{collection}/{id}` removes one document
//!
//! There is no server push, so [`RemoteStore::subscribe`] polls the
//! collection and only forwards a snapshot when it differs from the last one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio::time::MissedTickBehavior;
use url::Url;

use common::event_location::{decode_documents, EventDocument};
use common::prelude::*;
use common::store::Snapshot;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum HttpStoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}: {1}")]
    Status(StatusCode, String),
    #[error("store url cannot hold a collection path: {0}")]
    InvalidBaseUrl(Url),
}

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    remote: Url,
    collection: String,
    client: Client,
    poll_interval: Duration,
}

impl HttpRemoteStore {
    pub fn new(remote: &Url, collection: impl Into<String>) -> Result<Self, HttpStoreError> {
        if remote.cannot_be_a_base() {
            return Err(HttpStoreError::InvalidBaseUrl(remote.clone()));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            collection: collection.into(),
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    pub fn collection_url(&self) -> Url {
        self.url_with(&[])
    }

    pub fn document_url(&self, id: &str) -> Url {
        self.url_with(&[id])
    }

    fn url_with(&self, extra: &[&str]) -> Url {
        let mut url = self.remote.clone();
        // checked in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.collection)
                .extend(extra.iter().copied());
        }
        url
    }

    async fn fetch(&self) -> Result<Vec<EventLocation>, HttpStoreError> {
        let response = self.client.get(self.collection_url()).send().await?;
        if !response.status().is_success() {
            return Err(HttpStoreError::Status(
                response.status(),
                response.text().await?,
            ));
        }
        let documents: Vec<serde_json::Value> = response.json().await?;
        Ok(decode_documents(documents))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    type Error = HttpStoreError;

    async fn list(&self) -> Result<Vec<EventLocation>, StoreError<Self::Error>> {
        Ok(self.fetch().await?)
    }

    async fn create(&self, event: &EventLocation) -> Result<(), StoreError<Self::Error>> {
        let response = self
            .client
            .put(self.document_url(&event.id))
            .json(&EventDocument::from(event))
            .send()
            .await
            .map_err(HttpStoreError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HttpStoreError::Status(status, body).into());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError<Self::Error>> {
        let response = self
            .client
            .delete(self.document_url(id))
            .send()
            .await
            .map_err(HttpStoreError::from)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(HttpStoreError::Status(status, body).into())
    }

    /// Poll the collection in a background task
    ///
    /// Must be called from within a tokio runtime. The first poll happens
    /// immediately. A failing poll is forwarded once per outage.
    fn subscribe(&self) -> Subscription<Self::Error> {
        let (tx, rx) = flume::unbounded::<Snapshot<HttpStoreError>>();
        let store = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Vec<EventLocation>> = None;
            let mut failing = false;

            loop {
                interval.tick().await;
                let snapshot = match store.fetch().await {
                    Ok(events) => {
                        failing = false;
                        if last.as_ref() == Some(&events) {
                            continue;
                        }
                        last = Some(events.clone());
                        Ok(events)
                    }
                    Err(e) => {
                        tracing::debug!("Polling {} failed: {}", store.collection_url(), e);
                        if failing {
                            continue;
                        }
                        failing = true;
                        Err(StoreError::Transport(e))
                    }
                };
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Subscription::with_task(rx, task.abort_handle())
    }
}
