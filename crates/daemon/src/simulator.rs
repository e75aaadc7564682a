//! Software stand-in for the platform location service
//!
//! Tracks a single device position and reports inside/outside for every
//! monitored region by great-circle distance. Like a real platform it
//! determines the state of a region as soon as monitoring starts, and
//! reports a transition whenever the device crosses a region boundary.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use common::monitor::{AuthorizationStatus, CircularRegion, LocationService, RegionState};
use common::prelude::*;

use crate::state::DeviceConfig;

#[derive(Debug, Default)]
struct SimulatorState {
    regions: BTreeMap<String, CircularRegion>,
    /// last state reported per region
    reported: BTreeMap<String, RegionState>,
}

#[derive(Debug)]
pub struct SimulatedLocationService {
    position: Mutex<Coordinate>,
    authorization: Mutex<AuthorizationStatus>,
    available: bool,
    max_distance: f64,
    state: Mutex<SimulatorState>,
    sink: Mutex<Option<LocationEventSink>>,
}

impl SimulatedLocationService {
    pub fn new(position: Coordinate, max_distance: f64) -> Self {
        Self {
            position: Mutex::new(position),
            authorization: Mutex::new(AuthorizationStatus::Always),
            available: true,
            max_distance,
            state: Mutex::new(SimulatorState::default()),
            sink: Mutex::new(None),
        }
    }

    pub fn from_config(device: &DeviceConfig) -> Self {
        let mut simulator = Self::new(device.position(), device.max_monitoring_distance);
        simulator.available = device.monitoring_available;
        *simulator.authorization.get_mut() = device.authorization;
        simulator
    }

    /// Deliver callbacks to `sink` from now on
    pub fn attach(&self, sink: LocationEventSink) {
        *self.sink.lock() = Some(sink);
    }

    pub fn position(&self) -> Coordinate {
        *self.position.lock()
    }

    /// Move the device, reporting every region boundary it crosses
    pub fn move_to(&self, position: Coordinate) {
        *self.position.lock() = position;
        tracing::debug!("Simulated device moved to {}", position);

        let changes: Vec<(String, RegionState)> = {
            let mut state = self.state.lock();
            let SimulatorState { regions, reported } = &mut *state;
            regions
                .values()
                .filter_map(|region| {
                    let current = region_state(region, &position);
                    let previous = reported.insert(region.id.clone(), current);
                    (previous != Some(current)).then(|| (region.id.clone(), current))
                })
                .collect()
        };

        for (region_id, state) in changes {
            self.emit(|sink| sink.did_determine_state(region_id, state));
        }
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        *self.authorization.lock() = status;
        self.emit(|sink| sink.did_change_authorization(status));
    }

    /// Report a subscription failure, as a platform out of region slots would
    pub fn fail_region(&self, region_id: &str, reason: &str) {
        self.state.lock().reported.remove(region_id);
        self.emit(|sink| sink.monitoring_did_fail(region_id, reason));
    }

    fn emit(&self, deliver: impl FnOnce(&LocationEventSink)) {
        if let Some(sink) = self.sink.lock().as_ref() {
            deliver(sink);
        }
    }
}

impl LocationService for SimulatedLocationService {
    fn is_monitoring_available(&self) -> bool {
        self.available
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization.lock()
    }

    fn maximum_monitoring_distance(&self) -> f64 {
        self.max_distance
    }

    fn monitored_regions(&self) -> Vec<String> {
        self.state.lock().regions.keys().cloned().collect()
    }

    fn start_monitoring(&self, region: &CircularRegion) {
        let current = region_state(region, &self.position());
        {
            let mut state = self.state.lock();
            state.regions.insert(region.id.clone(), region.clone());
            state.reported.insert(region.id.clone(), current);
        }
        let region_id = region.id.clone();
        self.emit(|sink| sink.did_determine_state(region_id, current));
    }

    fn stop_monitoring(&self, region_id: &str) {
        let mut state = self.state.lock();
        state.regions.remove(region_id);
        state.reported.remove(region_id);
    }
}

fn region_state(region: &CircularRegion, position: &Coordinate) -> RegionState {
    if region.contains(position) {
        RegionState::Inside
    } else {
        RegionState::Outside
    }
}
