//! Integration tests driving the sync controller with the simulated device

mod common;

use std::sync::Arc;

use ::common::monitor::AuthorizationStatus;
use ::common::prelude::*;
use anyhow::Result;
use checkin_daemon::{Session, SimulatedLocationService};

use crate::common::{event_at, init_tracing, wait_for};

fn session_with(events: Vec<EventLocation>) -> Session<MemoryRemoteStore> {
    init_tracing();
    let simulator = Arc::new(SimulatedLocationService::new(
        Coordinate::new(10.0, 10.0),
        1000.0,
    ));
    Session::start(
        MemoryRemoteStore::with_events(events),
        simulator,
        SyncConfig::default(),
    )
}

#[tokio::test]
async fn test_walking_in_and_out_of_a_region() -> Result<()> {
    let session = session_with(vec![event_at("office", 0.0, 0.0, 500.0)]);
    session.refresh().await?;
    session.controller.settle().await?;
    assert!(!session.controller.can_check_in());

    let mut events = session.controller.subscribe();
    session.simulator.move_to(Coordinate::new(0.001, 0.001));
    wait_for(&mut events, |e| matches!(e, SyncEvent::RegionEntered { .. })).await;
    assert!(session.controller.can_check_in());
    assert_eq!(
        session.controller.region_state("office").await?,
        Some(RegionState::Inside)
    );

    session.simulator.move_to(Coordinate::new(1.0, 1.0));
    wait_for(&mut events, |e| matches!(e, SyncEvent::RegionExited { .. })).await;
    assert!(!session.controller.can_check_in());
    Ok(())
}

#[tokio::test]
async fn test_starting_inside_is_reported_on_refresh() -> Result<()> {
    let session = session_with(vec![event_at("here", 10.0, 10.0, 100.0)]);
    session.refresh().await?;
    session.controller.settle().await?;
    assert!(session.controller.can_check_in());
    Ok(())
}

#[tokio::test]
async fn test_remove_clears_inside_set() -> Result<()> {
    let session = session_with(vec![
        event_at("here", 10.0, 10.0, 100.0),
        event_at("far", 0.0, 0.0, 100.0),
    ]);
    session.refresh().await?;
    session.controller.settle().await?;
    assert_eq!(
        session.controller.inside_set().into_iter().collect::<Vec<_>>(),
        vec!["here"]
    );

    session.controller.remove_event("here").await?;
    assert!(session.controller.inside_set().is_empty());
    assert_eq!(session.controller.roster().ids(), vec!["far"]);

    // moving afterwards does not bring the deleted region back
    session.simulator.move_to(Coordinate::new(10.0, 10.0));
    session.controller.settle().await?;
    assert!(session.controller.inside_set().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_large_radius_is_clamped_to_device_maximum() -> Result<()> {
    let session = session_with(vec![]);
    let stored = session
        .controller
        .add_event(event_at("huge", 0.0, 0.0, 5000.0))
        .await?;
    assert_eq!(stored.radius, 1000.0);

    session.refresh().await?;
    session.controller.settle().await?;
    // 0.05 degrees is roughly 5.5 km, outside the clamped region
    session.simulator.move_to(Coordinate::new(0.05, 0.0));
    session.controller.settle().await?;
    assert!(!session.controller.can_check_in());
    Ok(())
}

#[tokio::test]
async fn test_authorization_change_publishes_warning() -> Result<()> {
    let session = session_with(vec![]);
    let mut events = session.controller.subscribe();

    session
        .simulator
        .set_authorization(AuthorizationStatus::WhenInUse);
    let warning = wait_for(&mut events, |e| {
        matches!(e, SyncEvent::AuthorizationWarning { .. })
    })
    .await;
    assert_eq!(
        warning,
        SyncEvent::AuthorizationWarning {
            status: AuthorizationStatus::WhenInUse
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_region_failure_is_reported() -> Result<()> {
    let session = session_with(vec![event_at("here", 10.0, 10.0, 100.0)]);
    session.refresh().await?;
    session.controller.settle().await?;

    let mut events = session.controller.subscribe();
    session.simulator.fail_region("here", "too many regions");
    wait_for(&mut events, |e| matches!(e, SyncEvent::MonitoringFailed { .. })).await;

    assert!(!session.controller.can_check_in());
    assert!(session.controller.roster().contains("here"));
    assert!(session.controller.region_state("here").await.is_err());
    Ok(())
}
