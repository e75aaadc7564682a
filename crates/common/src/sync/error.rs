use crate::event_location::ValidationError;
use crate::monitor::MonitorError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A remote store call failed. Local state is left untouched.
    #[error("remote store error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),
    #[error("region monitoring is not available on this device")]
    MonitoringUnavailable,
    #[error("monitoring failed for region {region_id}: {reason}")]
    MonitoringFailed { region_id: String, reason: String },
    #[error("event roster is full ({max} events)")]
    RosterFull { max: usize },
    #[error("sync worker has shut down")]
    WorkerClosed,
}

impl SyncError {
    pub fn transport<E>(error: StoreError<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SyncError::Transport(Box::new(error))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

impl From<MonitorError> for SyncError {
    fn from(error: MonitorError) -> Self {
        match error {
            MonitorError::Unavailable => SyncError::MonitoringUnavailable,
        }
    }
}
