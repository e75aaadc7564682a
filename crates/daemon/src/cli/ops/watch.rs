use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use checkin_daemon::{Session, SessionError};
use common::prelude::*;
use common::sync::SnapshotOrigin;

/// Run the synchronizer against the configured store until Ctrl-C
///
/// While running, type `<latitude> <longitude>` and press enter to move the
/// simulated device.
#[derive(Args, Debug, Clone)]
pub struct Watch {
    /// Start the simulated device at this latitude instead of the configured one
    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<f64>,

    /// Start the simulated device at this longitude instead of the configured one
    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<f64>,
}

#[derive(Debug)]
pub struct WatchOutput {
    pub events_seen: usize,
    pub roster_len: usize,
    pub inside: Vec<String>,
}

impl fmt::Display for WatchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Stopped watching".bold())?;
        writeln!(f, "  {} {}", "Sync events:".dimmed(), self.events_seen)?;
        writeln!(f, "  {} {}", "Roster size:".dimmed(), self.roster_len)?;
        if self.inside.is_empty() {
            write!(f, "  {} none", "Inside:".dimmed())
        } else {
            write!(f, "  {} {}", "Inside:".dimmed(), self.inside.join(", "))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Watch {
    type Error = WatchError;
    type Output = WatchOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx.config_path.clone())?;
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            session.simulator.move_to(Coordinate::new(latitude, longitude));
        }

        let mut events = session.controller.subscribe();
        session.refresh().await?;
        let listener = session.controller.listen();

        println!(
            "{} device at {} ({} events). Enter `<lat> <lon>` to move, Ctrl-C to stop.",
            "Watching".green().bold(),
            session.simulator.position(),
            session.controller.roster().len()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut events_seen = 0;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        events_seen += 1;
                        println!("{}", describe(&event));
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("Missed {} sync events", missed);
                    }
                    Err(RecvError::Closed) => break,
                },
                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => match parse_position(&line) {
                        Some(position) => session.simulator.move_to(position),
                        None if line.trim().is_empty() => {}
                        None => eprintln!("{} expected `<latitude> <longitude>`", "error:".red()),
                    },
                    None => stdin_open = false,
                },
            }
        }

        listener.abort();
        let output = WatchOutput {
            events_seen,
            roster_len: session.controller.roster().len(),
            inside: session.controller.inside_set().into_iter().collect(),
        };
        session.shutdown();
        Ok(output)
    }
}

fn parse_position(line: &str) -> Option<Coordinate> {
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let latitude = parts.next()?.parse().ok()?;
    let longitude = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let position = Coordinate::new(latitude, longitude);
    position.is_finite().then_some(position)
}

fn describe(event: &SyncEvent) -> String {
    match event {
        SyncEvent::RosterReplaced {
            generation,
            origin,
            count,
        } => {
            let origin = match origin {
                SnapshotOrigin::Refresh => "refresh",
                SnapshotOrigin::Push => "remote change",
            };
            format!(
                "{} {} events from {} (generation {})",
                "roster".cyan(),
                count,
                origin,
                generation
            )
        }
        SyncEvent::SnapshotSuperseded {
            generation,
            applied,
        } => format!(
            "{} snapshot {} superseded by {}",
            "roster".cyan(),
            generation,
            applied
        ),
        SyncEvent::EventRemoved { id } => format!("{} {}", "removed".yellow(), id),
        SyncEvent::RegionEntered { region_id } => {
            format!("{} {}", "entered".green().bold(), region_id)
        }
        SyncEvent::RegionExited { region_id } => {
            format!("{} {}", "exited".yellow().bold(), region_id)
        }
        SyncEvent::CheckInAvailabilityChanged { available: true } => {
            format!("{}", "check-in available".green())
        }
        SyncEvent::CheckInAvailabilityChanged { available: false } => {
            format!("{}", "check-in unavailable".dimmed())
        }
        SyncEvent::MonitoringFailed { region_id, reason } => {
            format!("{} {}: {}", "monitoring failed".red(), region_id, reason)
        }
        SyncEvent::MonitoringUnavailable => {
            format!("{}", "region monitoring unavailable on this device".red())
        }
        SyncEvent::AuthorizationWarning { status } => format!(
            "{} location authorization is {}, regions may not trigger",
            "warning".yellow(),
            status
        ),
        SyncEvent::RemoteError { message } => format!("{} {}", "remote error".red(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position() {
        assert_eq!(
            parse_position("37.33 -122.03"),
            Some(Coordinate::new(37.33, -122.03))
        );
        assert_eq!(
            parse_position(" 1.5, 2.5 "),
            Some(Coordinate::new(1.5, 2.5))
        );
        assert_eq!(parse_position("1.5"), None);
        assert_eq!(parse_position("1 2 3"), None);
        assert_eq!(parse_position("north south"), None);
        assert_eq!(parse_position("NaN 0"), None);
    }
}
