use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::event_location::EventLocation;

use super::location_service::LocationService;
use super::region::{AuthorizationStatus, CircularRegion, RegionState, RegionStatus};

/// Ids of the regions the device is currently inside
pub type InsideSet = BTreeSet<String>;

/// How subscriptions are reconciled with the roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResyncStrategy {
    /// Stop every monitored region, then start one per roster entry.
    /// Coverage briefly drops on every resync.
    #[default]
    Full,
    /// Stop regions that left the roster and start only new or changed ones
    Diff,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("region monitoring is not available on this device")]
    Unavailable,
}

/// Outcome of a resync
#[derive(Debug, Clone, PartialEq)]
pub struct ResyncReport {
    pub started: usize,
    pub stopped: usize,
    /// Region ids monitored once the resync finished
    pub monitored: Vec<String>,
    pub authorization: AuthorizationStatus,
}

/// A change in inside-set membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Entered(String),
    Exited(String),
}

#[derive(Debug, Clone)]
struct MonitoredRegion {
    region: CircularRegion,
    status: RegionStatus,
}

/// Owner of platform region subscriptions and of the inside-set
///
/// Not synchronized: a single task (the sync worker) owns the monitor and
/// funnels every platform callback through it. Observers read the inside-set
/// through the [`watch`] channel returned by [`RegionMonitor::subscribe_inside`].
#[derive(Debug)]
pub struct RegionMonitor {
    service: Arc<dyn LocationService>,
    strategy: ResyncStrategy,
    regions: BTreeMap<String, MonitoredRegion>,
    inside: watch::Sender<InsideSet>,
}

impl RegionMonitor {
    pub fn new(service: Arc<dyn LocationService>, strategy: ResyncStrategy) -> Self {
        let (inside, _) = watch::channel(InsideSet::new());
        Self {
            service,
            strategy,
            regions: BTreeMap::new(),
            inside,
        }
    }

    /// Reconcile platform subscriptions with `roster`.
    ///
    /// Every roster entry ends up monitored under its id with its radius
    /// clamped to the platform maximum; every other region is stopped. Ids
    /// that left the roster are also dropped from the inside-set.
    pub fn sync_subscriptions(
        &mut self,
        roster: &[EventLocation],
    ) -> Result<ResyncReport, MonitorError> {
        if !self.service.is_monitoring_available() {
            tracing::warn!("Geofencing is not supported on this device");
            return Err(MonitorError::Unavailable);
        }

        let authorization = self.service.authorization_status();
        if !authorization.permits_monitoring() {
            tracing::warn!(
                "Location authorization is {}, regions are saved but may not trigger",
                authorization
            );
        }

        let max_distance = self.service.maximum_monitoring_distance();
        let wanted: BTreeMap<String, CircularRegion> = roster
            .iter()
            .map(|event| {
                (
                    event.id.clone(),
                    CircularRegion::from_event(event, max_distance),
                )
            })
            .collect();

        let (started, stopped) = match self.strategy {
            ResyncStrategy::Full => self.resync_full(&wanted),
            ResyncStrategy::Diff => self.resync_diff(&wanted),
        };

        self.inside.send_if_modified(|inside| {
            let before = inside.len();
            inside.retain(|id| wanted.contains_key(id));
            inside.len() != before
        });

        let monitored: Vec<String> = self.regions.keys().cloned().collect();
        tracing::debug!(
            "Resynced regions ({:?}): started={}, stopped={}, monitored={}",
            self.strategy,
            started,
            stopped,
            monitored.len()
        );

        Ok(ResyncReport {
            started,
            stopped,
            monitored,
            authorization,
        })
    }

    fn resync_full(&mut self, wanted: &BTreeMap<String, CircularRegion>) -> (usize, usize) {
        let mut stopped = 0;
        for id in self.service.monitored_regions() {
            self.service.stop_monitoring(&id);
            stopped += 1;
        }
        self.regions.clear();

        for (id, region) in wanted {
            self.start(id, region.clone());
        }
        (wanted.len(), stopped)
    }

    fn resync_diff(&mut self, wanted: &BTreeMap<String, CircularRegion>) -> (usize, usize) {
        let platform: BTreeSet<String> = self.service.monitored_regions().into_iter().collect();
        let mut started = 0;
        let mut stopped = 0;

        for id in platform.iter().filter(|id| !wanted.contains_key(*id)) {
            self.service.stop_monitoring(id);
            stopped += 1;
        }
        self.regions.retain(|id, _| wanted.contains_key(id));

        for (id, region) in wanted {
            let unchanged = platform.contains(id)
                && self
                    .regions
                    .get(id)
                    .is_some_and(|m| {
                        &m.region == region && !matches!(m.status, RegionStatus::Failed { .. })
                    });
            if unchanged {
                continue;
            }
            if platform.contains(id) {
                self.service.stop_monitoring(id);
                stopped += 1;
            }
            self.start(id, region.clone());
            started += 1;
        }
        (started, stopped)
    }

    fn start(&mut self, id: &str, region: CircularRegion) {
        self.service.start_monitoring(&region);
        self.regions.insert(
            id.to_string(),
            MonitoredRegion {
                region,
                status: RegionStatus::Monitoring(RegionState::Unknown),
            },
        );
    }

    /// Stop a single region, e.g. after its event was deleted
    pub fn stop(&mut self, region_id: &str) -> bool {
        let known = self.regions.remove(region_id).is_some();
        if known || self.service.monitored_regions().iter().any(|id| id == region_id) {
            self.service.stop_monitoring(region_id);
        }
        known
    }

    /// Apply a platform state determination.
    ///
    /// Determinations for regions this monitor is not tracking are stale
    /// (the region was stopped after the platform queued the callback) and
    /// are ignored.
    pub fn on_state_determined(
        &mut self,
        region_id: &str,
        state: RegionState,
    ) -> Option<MembershipChange> {
        let Some(monitored) = self.regions.get_mut(region_id) else {
            tracing::debug!(
                "Ignoring {} determination for unmonitored region {}",
                state,
                region_id
            );
            return None;
        };
        monitored.status = RegionStatus::Monitoring(state);

        match state {
            RegionState::Inside => {
                let entered = self
                    .inside
                    .send_if_modified(|inside| inside.insert(region_id.to_string()));
                entered.then(|| MembershipChange::Entered(region_id.to_string()))
            }
            RegionState::Outside => self
                .remove_inside(region_id)
                .then(|| MembershipChange::Exited(region_id.to_string())),
            RegionState::Unknown => None,
        }
    }

    /// Record a failed subscription. The region is not retried, and since no
    /// further determinations will arrive it is dropped from the inside-set.
    pub fn on_monitoring_failed(&mut self, region_id: &str, reason: &str) -> bool {
        tracing::warn!(
            "Monitoring failed for region with identifier {}: {}",
            region_id,
            reason
        );
        let Some(monitored) = self.regions.get_mut(region_id) else {
            return false;
        };
        monitored.status = RegionStatus::Failed {
            reason: reason.to_string(),
        };
        self.remove_inside(region_id);
        true
    }

    /// Drop `region_id` from the inside-set without waiting for an exit
    /// callback, returning whether it was present
    pub fn remove_inside(&mut self, region_id: &str) -> bool {
        self.inside
            .send_if_modified(|inside| inside.remove(region_id))
    }

    pub fn status(&self, region_id: &str) -> Option<RegionStatus> {
        self.regions.get(region_id).map(|m| m.status.clone())
    }

    pub fn monitored_ids(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    pub fn inside_set(&self) -> InsideSet {
        self.inside.borrow().clone()
    }

    /// Check-in and check-out are only offered while inside some region
    pub fn can_check_in(&self) -> bool {
        !self.inside.borrow().is_empty()
    }

    pub fn subscribe_inside(&self) -> watch::Receiver<InsideSet> {
        self.inside.subscribe()
    }
}
