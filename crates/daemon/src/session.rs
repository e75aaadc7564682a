use std::sync::Arc;

use tokio::task::JoinHandle;

use common::prelude::*;

use crate::http_store::{HttpRemoteStore, HttpStoreError};
use crate::simulator::SimulatedLocationService;
use crate::state::{AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Store(#[from] HttpStoreError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// A running sync controller wired to a store and the simulated device
///
/// The simulator is attached to the controller, so moving it feeds region
/// callbacks straight into the worker.
#[derive(Debug)]
pub struct Session<S: RemoteStore = HttpRemoteStore> {
    pub controller: SyncController<S>,
    pub simulator: Arc<SimulatedLocationService>,
    worker: JoinHandle<()>,
}

impl Session<HttpRemoteStore> {
    /// Load the app state at `config_path` and start a session against the
    /// configured HTTP store
    pub fn open(config_path: Option<std::path::PathBuf>) -> Result<Self, SessionError> {
        let state = AppState::load(config_path)?;
        Self::from_state(&state)
    }

    pub fn from_state(state: &AppState) -> Result<Self, SessionError> {
        let store = state.store()?;
        Ok(Self::start(store, state.location_service(), state.config.sync.clone()))
    }
}

impl<S: RemoteStore> Session<S> {
    pub fn start(
        store: S,
        simulator: Arc<SimulatedLocationService>,
        config: SyncConfig,
    ) -> Self {
        let (controller, worker) = SyncController::builder(store)
            .config(config)
            .location_service(simulator.clone())
            .spawn();
        simulator.attach(controller.location_events());
        Self {
            controller,
            simulator,
            worker,
        }
    }

    /// Refresh the roster. Unavailable monitoring only warns, the roster is
    /// still replaced.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        match self.controller.refresh().await {
            Ok(outcome) => {
                tracing::debug!("Refreshed: {:?}", outcome);
                Ok(())
            }
            Err(SyncError::MonitoringUnavailable) => {
                tracing::warn!("Region monitoring unavailable, roster loaded without regions");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Stop the worker. Pending jobs are dropped.
    pub fn shutdown(self) {
        self.worker.abort();
    }
}
