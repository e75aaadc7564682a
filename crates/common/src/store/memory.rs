//! In-memory remote store
//!
//! Holds raw JSON documents and decodes them on every read, so malformed
//! documents behave exactly as they would against a real document store.
//! Useful for tests and for running the controller without a backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::event_location::{decode_documents, EventDocument, EventLocation};

use super::{RemoteStore, Snapshot, StoreError, Subscription};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("remote store unavailable")]
    Unavailable,
}

#[derive(Debug, Default)]
struct MemoryInner {
    documents: Vec<serde_json::Value>,
    offline: bool,
    /// delays applied to upcoming `list` calls, in call order
    list_delays: VecDeque<Duration>,
    subscribers: Vec<flume::Sender<Snapshot<MemoryStoreError>>>,
}

impl MemoryInner {
    fn snapshot(&self) -> Vec<EventLocation> {
        decode_documents(self.documents.iter().cloned())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.get("id").and_then(|v| v.as_str()) == Some(id))
    }

    fn upsert(&mut self, document: serde_json::Value) {
        let id = document
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        match id.and_then(|id| self.position(&id)) {
            Some(index) => self.documents[index] = document,
            None => self.documents.push(document),
        }
    }

    fn publish(&mut self, snapshot: Snapshot<MemoryStoreError>) {
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn notify(&mut self) {
        let snapshot = Ok(self.snapshot());
        self.publish(snapshot);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `events`
    pub fn with_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = EventLocation>,
    {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for event in events {
                inner.upsert(EventDocument::encode(&event));
            }
        }
        store
    }

    /// Write a raw document as a remote writer would, bypassing validation
    pub fn insert_document(&self, document: serde_json::Value) {
        let mut inner = self.inner.lock();
        inner.upsert(document);
        inner.notify();
    }

    /// Upsert a record from another client, notifying subscribers
    pub fn remote_upsert(&self, event: &EventLocation) {
        self.insert_document(EventDocument::encode(event));
    }

    /// Delete a record from another client, notifying subscribers
    pub fn remote_delete(&self, id: &str) {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.position(id) {
            inner.documents.remove(index);
            inner.notify();
        }
    }

    /// Toggle simulated transport failure. Going offline also pushes an
    /// error to every subscriber.
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.inner.lock();
        inner.offline = offline;
        if offline {
            inner.publish(Err(StoreError::Transport(MemoryStoreError::Unavailable)));
        }
    }

    /// Delay the next not-yet-delayed `list` call. The listing itself is
    /// captured before the delay, as an in-flight request would be.
    pub fn push_list_delay(&self, delay: Duration) {
        self.inner.lock().list_delays.push_back(delay);
    }

    /// Decoded view of the collection
    pub fn events(&self) -> Vec<EventLocation> {
        self.inner.lock().snapshot()
    }

    /// Number of raw documents, including malformed ones
    pub fn document_count(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| !tx.is_disconnected());
        inner.subscribers.len()
    }

    fn check_online(inner: &MemoryInner) -> Result<(), StoreError<MemoryStoreError>> {
        if inner.offline {
            Err(StoreError::Transport(MemoryStoreError::Unavailable))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    type Error = MemoryStoreError;

    async fn list(&self) -> Result<Vec<EventLocation>, StoreError<Self::Error>> {
        let (events, delay) = {
            let mut inner = self.inner.lock();
            Self::check_online(&inner)?;
            (inner.snapshot(), inner.list_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(events)
    }

    async fn create(&self, event: &EventLocation) -> Result<(), StoreError<Self::Error>> {
        let mut inner = self.inner.lock();
        Self::check_online(&inner)?;
        inner.upsert(EventDocument::encode(event));
        inner.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError<Self::Error>> {
        let mut inner = self.inner.lock();
        Self::check_online(&inner)?;
        if let Some(index) = inner.position(id) {
            inner.documents.remove(index);
            inner.notify();
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<Self::Error> {
        let (tx, rx) = flume::unbounded();
        let mut inner = self.inner.lock();
        let initial = match Self::check_online(&inner) {
            Ok(()) => Ok(inner.snapshot()),
            Err(e) => Err(e),
        };
        // the receiver is still in scope, this cannot fail
        let _ = tx.send(initial);
        inner.subscribers.push(tx);
        Subscription::new(rx)
    }
}
