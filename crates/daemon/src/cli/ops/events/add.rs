use std::fmt;

use chrono::{DateTime, Utc};
use clap::Args;
use owo_colors::OwoColorize;

use checkin_daemon::{Session, SessionError};
use common::prelude::*;

#[derive(Args, Debug, Clone)]
pub struct Add {
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub longitude: f64,

    /// Radius in meters, clamped to the device maximum
    #[arg(long)]
    pub radius: f64,

    /// Label shown for the event (empty shows as "No Note")
    #[arg(long, default_value = "")]
    pub name: String,

    /// Start of the event window (RFC 3339, e.g. 2024-01-04T09:00:00Z)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// End of the event window (RFC 3339)
    #[arg(long)]
    pub end: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AddOutput {
    pub event: EventLocation,
    pub requested_radius: f64,
}

impl fmt::Display for AddOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} event {}",
            "Added".green().bold(),
            self.event.title().bold()
        )?;
        writeln!(f, "  {} {}", "ID:".dimmed(), self.event.id)?;
        writeln!(f, "  {} {}", "Center:".dimmed(), self.event.coordinate)?;
        if self.event.radius < self.requested_radius {
            writeln!(
                f,
                "  {} {} m {}",
                "Radius:".dimmed(),
                self.event.radius,
                format!("(clamped from {} m)", self.requested_radius).yellow()
            )?;
        } else {
            writeln!(f, "  {} {} m", "Radius:".dimmed(), self.event.radius)?;
        }
        write!(
            f,
            "  {} {} to {}",
            "Window:".dimmed(),
            self.event.start_time.to_rfc3339(),
            self.event.end_time.to_rfc3339()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AddError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Add {
    type Error = AddError;
    type Output = AddOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx.config_path.clone())?;
        // the roster size gates adds
        session.refresh().await?;

        let event = EventLocation::new(
            Coordinate::new(self.latitude, self.longitude),
            self.radius,
            self.name.clone(),
            self.start,
            self.end,
        );
        let stored = session.controller.add_event(event).await?;
        session.shutdown();

        Ok(AddOutput {
            event: stored,
            requested_radius: self.radius,
        })
    }
}
