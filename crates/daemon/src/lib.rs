//! Operator shell around the geofence roster synchronizer
//!
//! Wires the sync core to an HTTP document store and a simulated device so
//! the whole flow can be driven from the command line.

pub mod http_store;
pub mod session;
pub mod simulator;

// App state (configuration, paths)
pub mod state;

pub use http_store::{HttpRemoteStore, HttpStoreError};
pub use session::{Session, SessionError};
pub use simulator::SimulatedLocationService;
pub use state::{AppConfig, AppState, DeviceConfig, StateError, StoreConfig};
