use std::fmt::Debug;

use async_trait::async_trait;
use tokio::task::AbortHandle;

use crate::event_location::EventLocation;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError<T> {
    /// The remote call failed (network, auth, ...)
    #[error("remote store transport error: {0}")]
    Transport(#[from] T),
    /// The push feed behind a subscription has ended
    #[error("remote store subscription closed")]
    SubscriptionClosed,
}

/// A full view of the remote collection, or the reason one could not be produced
pub type Snapshot<E> = Result<Vec<EventLocation>, StoreError<E>>;

/// Client for the remote collection holding event location documents.
///
/// Implementations decode documents themselves and must drop malformed ones
/// rather than failing a whole listing.
///
/// No ordering is promised between a local `create`/`delete` and the next
/// snapshot delivered through [`RemoteStore::subscribe`]; callers must
/// tolerate a push that does not yet reflect their own write.
#[async_trait]
pub trait RemoteStore: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the full current collection
    async fn list(&self) -> Result<Vec<EventLocation>, StoreError<Self::Error>>;

    /// Upsert a record by id
    async fn create(&self, event: &EventLocation) -> Result<(), StoreError<Self::Error>>;

    /// Remove a record by id. Deleting an id that does not exist succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError<Self::Error>>;

    /// Receive the full collection every time it changes remotely
    ///
    /// The first snapshot reflects the collection at subscription time.
    /// Dropping the returned handle ends the feed.
    fn subscribe(&self) -> Subscription<Self::Error>;
}

/// Handle on a push feed of collection snapshots
#[derive(Debug)]
pub struct Subscription<E> {
    rx: flume::Receiver<Snapshot<E>>,
    /// background task feeding `rx`, stopped when the handle is dropped
    task: Option<AbortHandle>,
}

impl<E> Subscription<E> {
    pub fn new(rx: flume::Receiver<Snapshot<E>>) -> Self {
        Self { rx, task: None }
    }

    /// Subscription fed by a spawned task that should not outlive it
    pub fn with_task(rx: flume::Receiver<Snapshot<E>>, task: AbortHandle) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Wait for the next snapshot
    ///
    /// Returns None once the feed has ended.
    pub async fn next(&self) -> Option<Snapshot<E>> {
        self.rx.recv_async().await.ok()
    }

    /// Take a snapshot if one is already queued
    pub fn try_next(&self) -> Option<Snapshot<E>> {
        self.rx.try_recv().ok()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
