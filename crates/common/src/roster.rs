//! The in-memory roster of known event locations
//!
//! The roster is a cheap-to-clone handle over shared state. Readers always
//! observe a complete roster: [`EventRoster::replace_all`] swaps the content
//! under a single write lock. A [`RosterView`] shares the same state but can
//! only read it.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::event_location::EventLocation;

/// Read-only handle on a roster
///
/// ```compile_fail
/// let roster = common::roster::EventRoster::new();
/// let view = roster.view().clone();
/// view.remove("a");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RosterView {
    events: Arc<RwLock<Vec<EventLocation>>>,
}

impl RosterView {
    pub fn get(&self, id: &str) -> Option<EventLocation> {
        self.events.read().iter().find(|e| e.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.events.read().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Consistent copy of the current roster
    pub fn snapshot(&self) -> Vec<EventLocation> {
        self.events.read().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.id.clone()).collect()
    }

    /// Events whose window strictly contains the current wall-clock time
    pub fn active_events(&self) -> Vec<EventLocation> {
        self.active_events_at(Utc::now())
    }

    pub fn active_events_at(&self, now: DateTime<Utc>) -> Vec<EventLocation> {
        self.events
            .read()
            .iter()
            .filter(|e| e.is_active_at(now))
            .cloned()
            .collect()
    }
}

/// Insertion-ordered set of event locations, at most one per id
#[derive(Debug, Clone, Default)]
pub struct EventRoster {
    view: RosterView,
}

impl EventRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only handle sharing this roster's state
    pub fn view(&self) -> &RosterView {
        &self.view
    }

    /// Swap the whole roster. Later records win over earlier ones sharing an id,
    /// keeping the position of the first occurrence.
    pub fn replace_all<I>(&self, records: I)
    where
        I: IntoIterator<Item = EventLocation>,
    {
        let mut deduped: Vec<EventLocation> = Vec::new();
        for record in records {
            upsert(&mut deduped, record);
        }
        *self.view.events.write() = deduped;
    }

    /// Insert, or overwrite the record with the same id
    pub fn add(&self, record: EventLocation) {
        upsert(&mut self.view.events.write(), record);
    }

    /// Remove a record by id, returning it if present
    pub fn remove(&self, id: &str) -> Option<EventLocation> {
        let mut events = self.view.events.write();
        let index = events.iter().position(|e| e.id == id)?;
        Some(events.remove(index))
    }
}

impl Deref for EventRoster {
    type Target = RosterView;

    fn deref(&self) -> &RosterView {
        &self.view
    }
}

fn upsert(events: &mut Vec<EventLocation>, record: EventLocation) {
    match events.iter_mut().find(|e| e.id == record.id) {
        Some(existing) => *existing = record,
        None => events.push(record),
    }
}
