use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use checkin_daemon::{Session, SessionError};
use common::prelude::*;

#[derive(Args, Debug, Clone)]
pub struct Remove {
    /// Id of the event to delete
    pub id: String,
}

#[derive(Debug)]
pub struct RemoveOutput {
    pub id: String,
    pub existed: bool,
}

impl fmt::Display for RemoveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.existed {
            write!(f, "{} event {}", "Removed".green().bold(), self.id)
        } else {
            write!(
                f,
                "{} event {} was not in the roster, nothing to remove",
                "Note:".yellow().bold(),
                self.id
            )
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoveError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Remove {
    type Error = RemoveError;
    type Output = RemoveOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx.config_path.clone())?;
        session.refresh().await?;
        let existed = session.controller.roster().contains(&self.id);

        // deletes are idempotent, issue it regardless
        session.controller.remove_event(&self.id).await?;
        session.shutdown();

        Ok(RemoveOutput {
            id: self.id.clone(),
            existed,
        })
    }
}
