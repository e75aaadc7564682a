//! Integration tests for platform callbacks flowing through the controller

mod common;

use std::sync::Arc;

use ::common::prelude::*;
use tokio::sync::broadcast;

use crate::common::{event, ids, setup, setup_with, RecordingLocationService};

fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_membership_events_and_availability() {
    let h = setup(vec![event("r1", 100.0), event("r2", 100.0)]);
    h.controller.refresh().await.unwrap();
    let mut rx = h.controller.subscribe();
    let sink = h.controller.location_events();

    sink.did_determine_state("r1", RegionState::Inside);
    sink.did_determine_state("r2", RegionState::Inside);
    sink.did_determine_state("r1", RegionState::Outside);
    sink.did_determine_state("r2", RegionState::Unknown);
    h.controller.settle().await.unwrap();

    assert_eq!(
        drain_events(&mut rx),
        vec![
            SyncEvent::RegionEntered { region_id: "r1".into() },
            SyncEvent::CheckInAvailabilityChanged { available: true },
            SyncEvent::RegionEntered { region_id: "r2".into() },
            SyncEvent::RegionExited { region_id: "r1".into() },
        ]
    );
    assert!(h.controller.can_check_in());

    sink.did_determine_state("r2", RegionState::Outside);
    h.controller.settle().await.unwrap();
    assert!(!h.controller.can_check_in());
    assert_eq!(
        drain_events(&mut rx),
        vec![
            SyncEvent::RegionExited { region_id: "r2".into() },
            SyncEvent::CheckInAvailabilityChanged { available: false },
        ]
    );
}

#[tokio::test]
async fn test_inside_watch_tracks_membership() {
    let h = setup(vec![event("r1", 100.0)]);
    h.controller.refresh().await.unwrap();
    let mut inside = h.controller.watch_inside();

    h.controller
        .location_events()
        .did_determine_state("r1", RegionState::Inside);
    inside.changed().await.unwrap();
    assert!(inside.borrow_and_update().contains("r1"));
}

#[tokio::test]
async fn test_callbacks_for_unmonitored_regions_are_ignored() {
    let h = setup(vec![event("a", 100.0)]);
    h.controller.refresh().await.unwrap();
    h.controller.remove_event("a").await.unwrap();

    // queued by the platform before the region was torn down
    h.controller
        .location_events()
        .did_determine_state("a", RegionState::Inside);
    h.controller.settle().await.unwrap();
    assert!(h.controller.inside_set().is_empty());
}

#[tokio::test]
async fn test_region_state_queries() {
    let h = setup(vec![event("a", 100.0)]);
    assert_eq!(h.controller.region_state("a").await.unwrap(), None);

    h.controller.refresh().await.unwrap();
    assert_eq!(
        h.controller.region_state("a").await.unwrap(),
        Some(RegionState::Unknown)
    );

    h.controller
        .location_events()
        .did_determine_state("a", RegionState::Outside);
    assert_eq!(
        h.controller.region_state("a").await.unwrap(),
        Some(RegionState::Outside)
    );
}

#[tokio::test]
async fn test_monitoring_failure_keeps_record() {
    let h = setup(vec![event("a", 100.0)]);
    h.controller.refresh().await.unwrap();
    let mut rx = h.controller.subscribe();
    let sink = h.controller.location_events();

    sink.did_determine_state("a", RegionState::Inside);
    sink.monitoring_did_fail("a", "region limit reached");
    h.controller.settle().await.unwrap();

    assert!(drain_events(&mut rx).contains(&SyncEvent::MonitoringFailed {
        region_id: "a".into(),
        reason: "region limit reached".into(),
    }));
    assert_eq!(ids(&h.controller.roster().snapshot()), vec!["a"]);
    assert!(!h.controller.can_check_in());
    assert!(matches!(
        h.controller.region_state("a").await,
        Err(SyncError::MonitoringFailed { .. })
    ));

    // the next resync starts it again
    h.controller.refresh().await.unwrap();
    assert_eq!(
        h.controller.region_state("a").await.unwrap(),
        Some(RegionState::Unknown)
    );
}

#[tokio::test]
async fn test_monitoring_unavailable_still_replaces_roster() {
    let h = setup(vec![event("a", 100.0)]);
    *h.service.available.lock() = false;
    let mut rx = h.controller.subscribe();

    assert!(matches!(
        h.controller.refresh().await,
        Err(SyncError::MonitoringUnavailable)
    ));
    assert_eq!(ids(&h.controller.roster().snapshot()), vec!["a"]);
    assert!(h.service.region_ids().is_empty());
    assert!(drain_events(&mut rx).contains(&SyncEvent::MonitoringUnavailable));
}

#[tokio::test]
async fn test_authorization_downgrade_warns_but_monitors() {
    let h = setup(vec![event("a", 100.0)]);
    *h.service.authorization.lock() = AuthorizationStatus::WhenInUse;
    let mut rx = h.controller.subscribe();

    h.controller.refresh().await.unwrap();
    assert_eq!(h.service.region_ids(), vec!["a"]);

    h.controller
        .location_events()
        .did_change_authorization(AuthorizationStatus::Denied);
    h.controller.settle().await.unwrap();

    let warnings: Vec<_> = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::AuthorizationWarning { .. }))
        .collect();
    assert_eq!(
        warnings,
        vec![
            SyncEvent::AuthorizationWarning {
                status: AuthorizationStatus::WhenInUse
            },
            SyncEvent::AuthorizationWarning {
                status: AuthorizationStatus::Denied
            },
        ]
    );
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let h = setup(vec![event("a", 100.0), event("b", 100.0)]);
    h.controller.refresh().await.unwrap();
    let first = h.service.region_ids();
    h.controller.refresh().await.unwrap();
    assert_eq!(h.service.region_ids(), first);
}

#[tokio::test]
async fn test_full_resync_restarts_every_region() {
    let h = setup(vec![event("a", 100.0)]);
    h.controller.refresh().await.unwrap();
    h.controller.refresh().await.unwrap();
    assert_eq!(*h.service.starts.lock(), vec!["a", "a"]);
}

#[tokio::test]
async fn test_diff_resync_keeps_unchanged_regions() {
    let config = SyncConfig {
        resync_strategy: ResyncStrategy::Diff,
        ..SyncConfig::default()
    };
    let h = setup_with(
        MemoryRemoteStore::with_events([event("a", 100.0), event("b", 100.0)]),
        config,
    );
    h.controller.refresh().await.unwrap();
    h.controller
        .location_events()
        .did_determine_state("a", RegionState::Inside);

    h.store.remote_delete("b");
    h.store.remote_upsert(&event("c", 100.0));
    h.controller.refresh().await.unwrap();

    assert_eq!(*h.service.starts.lock(), vec!["a", "b", "c"]);
    assert_eq!(*h.service.stops.lock(), vec!["b"]);
    // "a" was never torn down, so its membership survives
    assert!(h.controller.inside_set().contains("a"));
}

#[tokio::test]
async fn test_resync_prunes_inside_set() {
    let h = setup(vec![event("a", 100.0), event("b", 100.0)]);
    h.controller.refresh().await.unwrap();
    let sink = h.controller.location_events();
    sink.did_determine_state("a", RegionState::Inside);
    sink.did_determine_state("b", RegionState::Inside);

    h.store.remote_delete("a");
    h.controller.refresh().await.unwrap();
    assert_eq!(
        h.controller.inside_set().into_iter().collect::<Vec<_>>(),
        vec!["b"]
    );
}

#[tokio::test]
async fn test_controller_accepts_any_location_service() {
    let service: Arc<dyn LocationService> = Arc::new(RecordingLocationService::default());
    let (controller, _worker) = SyncController::builder(MemoryRemoteStore::new())
        .location_service(service)
        .max_events(5)
        .spawn();
    assert_eq!(controller.config().max_events, 5);
    assert_eq!(controller.clamp_radius(-3.0), 0.0);
    assert_eq!(controller.clamp_radius(4000.0), common::MAX_DISTANCE);
}
