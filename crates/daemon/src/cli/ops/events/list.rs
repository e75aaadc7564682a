use std::fmt;

use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::Table;
use owo_colors::OwoColorize;

use checkin_daemon::{Session, SessionError};
use common::event_location::EventDocument;
use common::prelude::*;

#[derive(Args, Debug, Clone)]
pub struct List {
    /// Only show events whose time window contains now
    #[arg(long)]
    pub active: bool,

    /// Print the raw documents as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct ListOutput {
    pub events: Vec<EventLocation>,
    pub now: DateTime<Utc>,
    pub json: bool,
}

impl fmt::Display for ListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.json {
            let documents: Vec<EventDocument> =
                self.events.iter().map(EventDocument::from).collect();
            let json = serde_json::to_string_pretty(&documents).map_err(|_| fmt::Error)?;
            return write!(f, "{json}");
        }

        if self.events.is_empty() {
            return write!(f, "No events found");
        }

        let mut table = Table::new();
        table.set_header(vec![
            "ID", "TITLE", "LATITUDE", "LONGITUDE", "RADIUS", "START", "END", "ACTIVE",
        ]);
        for e in &self.events {
            let active = if e.is_active_at(self.now) {
                "yes".green().to_string()
            } else {
                "no".dimmed().to_string()
            };
            table.add_row(vec![
                e.id.clone(),
                e.title().to_string(),
                format!("{:.6}", e.coordinate.latitude),
                format!("{:.6}", e.coordinate.longitude),
                format!("{:.0} m", e.radius),
                e.start_time.to_rfc3339(),
                e.end_time.to_rfc3339(),
                active,
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for List {
    type Error = ListError;
    type Output = ListOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx.config_path.clone())?;
        session.refresh().await?;

        let now = Utc::now();
        let events = if self.active {
            session.controller.roster().active_events_at(now)
        } else {
            session.controller.roster().snapshot()
        };
        session.shutdown();

        Ok(ListOutput {
            events,
            now,
            json: self.json,
        })
    }
}
