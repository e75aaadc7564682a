use std::collections::HashMap;

use crate::event_location::EventLocation;
use crate::monitor::{MembershipChange, RegionMonitor, RegionState, RegionStatus, ResyncReport};
use crate::roster::EventRoster;

use super::controller::RefreshOutcome;
use super::error::SyncError;
use super::events::{EventBus, SnapshotOrigin, SyncEvent};
use super::jobs::{JobReceiver, SyncJob};

/// Sole owner of the region monitor and sole writer of the roster
///
/// Drain it with [`SyncWorker::run`] on a dedicated task. The worker stops
/// once every [`SyncController`](super::SyncController) clone has been dropped.
#[derive(Debug)]
pub struct SyncWorker {
    jobs: JobReceiver,
    roster: EventRoster,
    monitor: RegionMonitor,
    events: EventBus,
    applied_generation: u64,
    /// ids removed locally, keyed to the generation of the removal
    tombstones: HashMap<String, u64>,
}

impl SyncWorker {
    pub(crate) fn new(
        jobs: JobReceiver,
        roster: EventRoster,
        monitor: RegionMonitor,
        events: EventBus,
    ) -> Self {
        Self {
            jobs,
            roster,
            monitor,
            events,
            applied_generation: 0,
            tombstones: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Sync worker started");
        while let Some(job) = self.jobs.recv_async().await {
            self.handle(job);
        }
        tracing::info!("Sync worker stopped, all controllers dropped");
    }

    /// Apply every job already queued, without waiting for more
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Some(job) = self.jobs.try_recv() {
            self.handle(job);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, job: SyncJob) {
        match job {
            SyncJob::ApplySnapshot {
                generation,
                origin,
                records,
                reply,
            } => {
                let result = self.apply_snapshot(generation, origin, records);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            SyncJob::RemoveEvent {
                generation,
                id,
                reply,
            } => {
                self.remove_event(generation, &id);
                let _ = reply.send(Ok(()));
            }
            SyncJob::StateDetermined { region_id, state } => {
                self.state_determined(&region_id, state);
            }
            SyncJob::MonitoringFailed { region_id, reason } => {
                self.monitoring_failed(&region_id, &reason);
            }
            SyncJob::AuthorizationChanged { status } => {
                tracing::info!("Location authorization changed to {}", status);
                if !status.permits_monitoring() {
                    self.events
                        .publish(SyncEvent::AuthorizationWarning { status });
                }
            }
            SyncJob::RemoteError { message } => {
                tracing::warn!("Remote change feed error: {}", message);
                self.events.publish(SyncEvent::RemoteError { message });
            }
            SyncJob::QueryRegion { region_id, reply } => {
                let _ = reply.send(self.region_state(&region_id));
            }
            SyncJob::Settle { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn apply_snapshot(
        &mut self,
        generation: u64,
        origin: SnapshotOrigin,
        records: Vec<EventLocation>,
    ) -> Result<RefreshOutcome, SyncError> {
        if generation <= self.applied_generation {
            tracing::debug!(
                "Discarding {} snapshot generation {}, already at {}",
                origin,
                generation,
                self.applied_generation
            );
            self.events.publish(SyncEvent::SnapshotSuperseded {
                generation,
                applied: self.applied_generation,
            });
            return Ok(RefreshOutcome::Superseded {
                generation,
                applied: self.applied_generation,
            });
        }

        self.applied_generation = generation;
        let records = self.drop_removed(generation, records);
        self.roster.replace_all(records);
        let count = self.roster.len();
        tracing::info!(
            "Roster replaced from {} (generation {}): {} events",
            origin,
            generation,
            count
        );
        self.events.publish(SyncEvent::RosterReplaced {
            generation,
            origin,
            count,
        });

        let report = self.resync()?;
        Ok(RefreshOutcome::Applied {
            generation,
            events: count,
            monitored: report.monitored.len(),
        })
    }

    /// Filter out records removed after `generation` was issued. Tombstones
    /// at or below `generation` are covered by the snapshot itself.
    fn drop_removed(&mut self, generation: u64, records: Vec<EventLocation>) -> Vec<EventLocation> {
        self.tombstones.retain(|_, removed_at| *removed_at > generation);
        if self.tombstones.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|record| {
                let removed = self.tombstones.contains_key(&record.id);
                if removed {
                    tracing::debug!(
                        "Skipping {} from generation {}, removed since",
                        record.id,
                        generation
                    );
                }
                !removed
            })
            .collect()
    }

    fn resync(&mut self) -> Result<ResyncReport, SyncError> {
        let was_available = self.monitor.can_check_in();
        let result = self.monitor.sync_subscriptions(&self.roster.snapshot());
        self.publish_availability(was_available);

        match result {
            Ok(report) => {
                if !report.authorization.permits_monitoring() {
                    self.events.publish(SyncEvent::AuthorizationWarning {
                        status: report.authorization,
                    });
                }
                Ok(report)
            }
            Err(e) => {
                self.events.publish(SyncEvent::MonitoringUnavailable);
                Err(e.into())
            }
        }
    }

    fn remove_event(&mut self, generation: u64, id: &str) {
        self.tombstones.insert(id.to_string(), generation);
        let was_available = self.monitor.can_check_in();

        self.roster.remove(id);
        self.monitor.stop(id);
        // the platform does not promise an exit callback for a stopped region
        self.monitor.remove_inside(id);

        tracing::info!("Removed event {} (generation {})", id, generation);
        self.events
            .publish(SyncEvent::EventRemoved { id: id.to_string() });
        self.publish_availability(was_available);
    }

    fn state_determined(&mut self, region_id: &str, state: RegionState) {
        let was_available = self.monitor.can_check_in();
        match self.monitor.on_state_determined(region_id, state) {
            Some(MembershipChange::Entered(region_id)) => {
                tracing::info!("Entered region {}", region_id);
                self.events.publish(SyncEvent::RegionEntered { region_id });
            }
            Some(MembershipChange::Exited(region_id)) => {
                tracing::info!("Exited region {}", region_id);
                self.events.publish(SyncEvent::RegionExited { region_id });
            }
            None => {}
        }
        self.publish_availability(was_available);
    }

    fn monitoring_failed(&mut self, region_id: &str, reason: &str) {
        let was_available = self.monitor.can_check_in();
        if self.monitor.on_monitoring_failed(region_id, reason) {
            self.events.publish(SyncEvent::MonitoringFailed {
                region_id: region_id.to_string(),
                reason: reason.to_string(),
            });
        }
        self.publish_availability(was_available);
    }

    fn region_state(&self, region_id: &str) -> Result<Option<RegionState>, SyncError> {
        match self.monitor.status(region_id) {
            None => Ok(None),
            Some(RegionStatus::Monitoring(state)) => Ok(Some(state)),
            Some(RegionStatus::Failed { reason }) => Err(SyncError::MonitoringFailed {
                region_id: region_id.to_string(),
                reason,
            }),
        }
    }

    fn publish_availability(&self, was_available: bool) {
        let available = self.monitor.can_check_in();
        if available != was_available {
            tracing::debug!("Check-in availability changed to {}", available);
            self.events
                .publish(SyncEvent::CheckInAvailabilityChanged { available });
        }
    }
}
