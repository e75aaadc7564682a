//! Roster synchronization
//!
//! [`SyncController`] is the single entry point for the UI layer. Every
//! mutation of the roster, the region subscriptions and the inside-set is
//! turned into a [`SyncJob`](jobs::SyncJob) and applied, in order, by one
//! [`SyncWorker`] task. Network results and platform callbacks arriving on
//! arbitrary tasks are funneled through the same queue.
//!
//! # Ordering
//!
//! Every snapshot (from `refresh` or from a remote push) and every local
//! removal takes a generation number from a shared counter when it is
//! issued. The worker only applies a snapshot newer than the last applied
//! one, so a slow `refresh` that was overtaken by a later one is reported as
//! [`RefreshOutcome::Superseded`] and leaves no trace. A removal does not
//! supersede anything: a snapshot issued before it is still applied, minus
//! the removed id.

mod config;
mod controller;
mod error;
mod events;
pub mod jobs;
mod worker;

pub use config::SyncConfig;
pub use controller::{
    NeedsLocationService, ReadyToBuild, RefreshOutcome, SyncController, SyncControllerBuilder,
};
pub use error::SyncError;
pub use events::{EventBus, SnapshotOrigin, SyncEvent};
pub use jobs::LocationEventSink;
pub use worker::SyncWorker;
