//! Shared harness for the sync integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use ::common::monitor::{AuthorizationStatus, CircularRegion, LocationService};
use ::common::prelude::*;
use ::common::sync::SyncWorker;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

pub const MAX_DISTANCE: f64 = 1000.0;

/// Location service that records every call and never moves
#[derive(Debug)]
pub struct RecordingLocationService {
    pub available: Mutex<bool>,
    pub authorization: Mutex<AuthorizationStatus>,
    pub regions: Mutex<BTreeMap<String, CircularRegion>>,
    pub starts: Mutex<Vec<String>>,
    pub stops: Mutex<Vec<String>>,
}

impl Default for RecordingLocationService {
    fn default() -> Self {
        Self {
            available: Mutex::new(true),
            authorization: Mutex::new(AuthorizationStatus::Always),
            regions: Mutex::new(BTreeMap::new()),
            starts: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingLocationService {
    pub fn region_ids(&self) -> Vec<String> {
        self.regions.lock().keys().cloned().collect()
    }

    pub fn region(&self, id: &str) -> Option<CircularRegion> {
        self.regions.lock().get(id).cloned()
    }
}

impl LocationService for RecordingLocationService {
    fn is_monitoring_available(&self) -> bool {
        *self.available.lock()
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization.lock()
    }

    fn maximum_monitoring_distance(&self) -> f64 {
        MAX_DISTANCE
    }

    fn monitored_regions(&self) -> Vec<String> {
        self.region_ids()
    }

    fn start_monitoring(&self, region: &CircularRegion) {
        self.starts.lock().push(region.id.clone());
        self.regions.lock().insert(region.id.clone(), region.clone());
    }

    fn stop_monitoring(&self, region_id: &str) {
        self.stops.lock().push(region_id.to_string());
        self.regions.lock().remove(region_id);
    }
}

pub struct Harness {
    pub controller: SyncController<MemoryRemoteStore>,
    pub store: MemoryRemoteStore,
    pub service: Arc<RecordingLocationService>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Controller over `store` with its worker spawned
pub fn setup_with(store: MemoryRemoteStore, config: SyncConfig) -> Harness {
    init_tracing();
    let service = Arc::new(RecordingLocationService::default());
    let (controller, _worker) = SyncController::builder(store.clone())
        .config(config)
        .location_service(service.clone())
        .spawn();
    Harness {
        controller,
        store,
        service,
    }
}

pub fn setup(events: Vec<EventLocation>) -> Harness {
    setup_with(MemoryRemoteStore::with_events(events), SyncConfig::default())
}

/// Controller whose worker is handed back to be driven by hand
pub fn setup_manual(
    events: Vec<EventLocation>,
) -> (
    SyncController<MemoryRemoteStore>,
    SyncWorker,
    Arc<RecordingLocationService>,
) {
    init_tracing();
    let service = Arc::new(RecordingLocationService::default());
    let (controller, worker) = SyncController::builder(MemoryRemoteStore::with_events(events))
        .location_service(service.clone())
        .build();
    (controller, worker, service)
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap()
}

pub fn event(id: &str, radius: f64) -> EventLocation {
    EventLocation::with_id(
        id,
        Coordinate::new(0.0, 0.0),
        radius,
        id.to_uppercase(),
        t0(),
        t0() + Duration::hours(1),
    )
}

/// Event whose window contains the current wall-clock time
pub fn live_event(id: &str) -> EventLocation {
    let now = Utc::now();
    EventLocation::with_id(
        id,
        Coordinate::new(0.0, 0.0),
        100.0,
        id,
        now - Duration::hours(1),
        now + Duration::hours(1),
    )
}

pub fn ids(events: &[EventLocation]) -> Vec<String> {
    events.iter().map(|e| e.id.clone()).collect()
}
