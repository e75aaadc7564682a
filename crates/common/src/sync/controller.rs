use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

use crate::event_location::{clamp_radius, EventLocation};
use crate::monitor::{InsideSet, LocationService, RegionMonitor, RegionState};
use crate::roster::{EventRoster, RosterView};
use crate::store::RemoteStore;

use super::config::SyncConfig;
use super::error::SyncError;
use super::events::{EventBus, SnapshotOrigin, SyncEvent};
use super::jobs::{JobDispatcher, LocationEventSink, SyncJob};
use super::worker::SyncWorker;

/// Result of applying a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot replaced the roster and regions were resynced
    Applied {
        generation: u64,
        events: usize,
        monitored: usize,
    },
    /// Newer state had already been applied; nothing changed
    Superseded { generation: u64, applied: u64 },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

/// Marker type for builder state: needs a location service
pub struct NeedsLocationService;

/// Marker type for builder state: ready to build
pub struct ReadyToBuild {
    service: Arc<dyn LocationService>,
}

/// Builder for a [`SyncController`] and its worker
///
/// The typestate makes a location service mandatory before building.
pub struct SyncControllerBuilder<S: RemoteStore, State = ReadyToBuild> {
    store: S,
    config: SyncConfig,
    state: State,
}

impl<S: RemoteStore, State> SyncControllerBuilder<S, State> {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_events(mut self, max_events: usize) -> Self {
        self.config.max_events = max_events;
        self
    }

    pub fn resync_strategy(mut self, strategy: crate::monitor::ResyncStrategy) -> Self {
        self.config.resync_strategy = strategy;
        self
    }
}

impl<S: RemoteStore> SyncControllerBuilder<S, NeedsLocationService> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: SyncConfig::default(),
            state: NeedsLocationService,
        }
    }

    /// Platform location service the region monitor drives
    pub fn location_service(
        self,
        service: Arc<dyn LocationService>,
    ) -> SyncControllerBuilder<S, ReadyToBuild> {
        SyncControllerBuilder {
            store: self.store,
            config: self.config,
            state: ReadyToBuild { service },
        }
    }
}

impl<S: RemoteStore> SyncControllerBuilder<S, ReadyToBuild> {
    /// Build the controller and the worker that must be run for it to make
    /// progress
    pub fn build(self) -> (SyncController<S>, SyncWorker) {
        let config = self.config;
        let service = self.state.service;

        let (jobs, receiver) = JobDispatcher::new();
        let roster = EventRoster::new();
        let events = EventBus::new(config.event_capacity);
        let monitor = RegionMonitor::new(service.clone(), config.resync_strategy);
        let inside = monitor.subscribe_inside();

        let worker = SyncWorker::new(receiver, roster.clone(), monitor, events.clone());
        let controller = SyncController {
            store: self.store,
            roster,
            jobs,
            generation: Arc::new(AtomicU64::new(0)),
            events,
            inside,
            service,
            config: Arc::new(config),
        };
        (controller, worker)
    }

    /// Build and spawn the worker on the current tokio runtime
    pub fn spawn(self) -> (SyncController<S>, JoinHandle<()>) {
        let (controller, worker) = self.build();
        let handle = tokio::spawn(worker.run());
        (controller, handle)
    }
}

/// Entry point for the UI layer
///
/// Cheap to clone; every clone feeds the same worker. Mutating calls are
/// queued and applied in order by the [`SyncWorker`], and the read-side
/// accessors observe the state it publishes.
#[derive(Debug)]
pub struct SyncController<S: RemoteStore> {
    store: S,
    roster: EventRoster,
    jobs: JobDispatcher,
    generation: Arc<AtomicU64>,
    events: EventBus,
    inside: watch::Receiver<InsideSet>,
    service: Arc<dyn LocationService>,
    config: Arc<SyncConfig>,
}

impl<S: RemoteStore> Clone for SyncController<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            roster: self.roster.clone(),
            jobs: self.jobs.clone(),
            generation: self.generation.clone(),
            events: self.events.clone(),
            inside: self.inside.clone(),
            service: self.service.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: RemoteStore> SyncController<S> {
    pub fn builder(store: S) -> SyncControllerBuilder<S, NeedsLocationService> {
        SyncControllerBuilder::new(store)
    }

    /// Fetch the whole collection, replace the roster and resync regions
    ///
    /// Safe to call while another refresh is in flight: whichever was issued
    /// last wins, and an overtaken call returns [`RefreshOutcome::Superseded`].
    /// On a transport error nothing local changes.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let generation = self.next_generation();
        tracing::debug!("Refreshing roster (generation {})", generation);

        let records = self.store.list().await.map_err(|e| {
            tracing::warn!("Failed to refresh roster: {}", e);
            SyncError::transport(e)
        })?;

        let (reply, rx) = oneshot::channel();
        self.jobs.dispatch(SyncJob::ApplySnapshot {
            generation,
            origin: SnapshotOrigin::Refresh,
            records,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| SyncError::WorkerClosed)?
    }

    /// Write a new event through to the remote store
    ///
    /// The radius is clamped to the platform maximum before the write. The
    /// roster itself is only updated by the next push or refresh, which may
    /// not include this write yet.
    pub async fn add_event(&self, event: EventLocation) -> Result<EventLocation, SyncError> {
        event.validate()?;
        if !self.roster.contains(&event.id) && !self.can_add_event() {
            return Err(SyncError::RosterFull {
                max: self.config.max_events,
            });
        }

        let max_distance = self.service.maximum_monitoring_distance();
        let event = event.clamped(max_distance);

        self.store.create(&event).await.map_err(|e| {
            tracing::warn!("Failed to create event {}: {}", event.id, e);
            SyncError::transport(e)
        })?;
        tracing::info!("Created event {} ({})", event.id, event.title());
        Ok(event)
    }

    /// Delete an event remotely, then drop it locally without waiting for
    /// the push
    pub async fn remove_event(&self, id: &str) -> Result<(), SyncError> {
        self.store.delete(id).await.map_err(|e| {
            tracing::warn!("Failed to delete event {}: {}", id, e);
            SyncError::transport(e)
        })?;

        let generation = self.next_generation();
        let (reply, rx) = oneshot::channel();
        self.jobs.dispatch(SyncJob::RemoveEvent {
            generation,
            id: id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| SyncError::WorkerClosed)?
    }

    /// Queue a pushed snapshot. Same effect as a successful refresh.
    pub fn on_remote_change(&self, records: Vec<EventLocation>) -> Result<(), SyncError> {
        let generation = self.next_generation();
        self.jobs.dispatch(SyncJob::ApplySnapshot {
            generation,
            origin: SnapshotOrigin::Push,
            records,
            reply: None,
        })
    }

    /// Forward the store's push feed into [`SyncController::on_remote_change`]
    ///
    /// Feed errors are published as [`SyncEvent::RemoteError`] and the feed
    /// keeps going. The task ends when the feed closes or the worker stops;
    /// aborting it drops the subscription.
    pub fn listen(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let subscription = self.store.subscribe();
        tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let result = match snapshot {
                    Ok(records) => controller.on_remote_change(records),
                    Err(e) => controller.jobs.dispatch(SyncJob::RemoteError {
                        message: e.to_string(),
                    }),
                };
                if result.is_err() {
                    tracing::debug!("Sync worker gone, stopping remote listener");
                    return;
                }
            }
            tracing::info!("Remote change feed closed");
        })
    }

    /// Wait until every job queued before this call has been applied
    pub async fn settle(&self) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.jobs.dispatch(SyncJob::Settle { reply })?;
        rx.await.map_err(|_| SyncError::WorkerClosed)
    }

    /// Current state of one region, or None if it is not monitored
    pub async fn region_state(&self, region_id: &str) -> Result<Option<RegionState>, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.jobs.dispatch(SyncJob::QueryRegion {
            region_id: region_id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| SyncError::WorkerClosed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn watch_inside(&self) -> watch::Receiver<InsideSet> {
        self.inside.clone()
    }

    pub fn inside_set(&self) -> InsideSet {
        self.inside.borrow().clone()
    }

    /// Check-in and check-out are offered only while inside some region
    pub fn can_check_in(&self) -> bool {
        !self.inside.borrow().is_empty()
    }

    /// Read-only handle on the roster. Only the worker writes to it.
    pub fn roster(&self) -> &RosterView {
        self.roster.view()
    }

    pub fn active_events(&self) -> Vec<EventLocation> {
        self.roster.active_events()
    }

    pub fn can_add_event(&self) -> bool {
        self.roster.len() < self.config.max_events
    }

    /// Sink to hand to the platform for its delegate callbacks
    pub fn location_events(&self) -> LocationEventSink {
        LocationEventSink::new(self.jobs.clone())
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clamp a radius the way [`SyncController::add_event`] will
    pub fn clamp_radius(&self, radius: f64) -> f64 {
        clamp_radius(radius, self.service.maximum_monitoring_distance())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}
