//! On-disk app state
//!
//! Everything lives in one directory (default `~/.checkin`):
//!
//! ```text
//! ~/.checkin/
//! └── config.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use common::monitor::AuthorizationStatus;
use common::prelude::*;

use crate::http_store::{HttpRemoteStore, HttpStoreError};
use crate::simulator::SimulatedLocationService;

pub const APP_DIR_NAME: &str = ".checkin";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_STORE_URL: &str = "http://localhost:8080";
pub const DEFAULT_COLLECTION: &str = "eventLocations";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_MONITORING_DISTANCE: f64 = 1000.0;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("not initialized, run `checkin init` first (looked in {})", .0.display())]
    NotInitialized(PathBuf),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the event collection lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: Url,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// How often `watch` polls the collection for remote changes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl StoreConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            collection: default_collection(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// The simulated device the CLI monitors regions for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub authorization: AuthorizationStatus,
    pub max_monitoring_distance: f64,
    pub monitoring_available: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            authorization: AuthorizationStatus::Always,
            max_monitoring_distance: DEFAULT_MAX_MONITORING_DISTANCE,
            monitoring_available: true,
        }
    }
}

impl DeviceConfig {
    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

impl AppConfig {
    pub fn new(store_url: Url) -> Self {
        Self {
            store: StoreConfig::new(store_url),
            sync: SyncConfig::default(),
            device: DeviceConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.store.collection.is_empty() {
            return Err(StateError::InvalidConfig(
                "store.collection must not be empty".to_string(),
            ));
        }
        if self.store.poll_interval_secs == 0 {
            return Err(StateError::InvalidConfig(
                "store.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if !self.device.position().is_finite() {
            return Err(StateError::InvalidConfig(
                "device position must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub app_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Resolve the app directory, defaulting to `~/.checkin`
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        match custom_path {
            Some(path) => Ok(path),
            None => dirs::home_dir()
                .map(|home| home.join(APP_DIR_NAME))
                .ok_or(StateError::NoHomeDirectory),
        }
    }

    /// Create the app directory and write its config
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(app_dir));
        }

        config.validate()?;

        std::fs::create_dir_all(&app_dir)?;
        let state = Self {
            app_dir,
            config_path,
            config,
        };
        state.save()?;
        tracing::info!("Initialized app directory at {}", state.app_dir.display());
        Ok(state)
    }

    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized(app_dir));
        }

        let config = read_config(&config_path)?;
        config.validate()?;
        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }

    pub fn save(&self) -> Result<(), StateError> {
        let contents = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, contents)?;
        Ok(())
    }

    /// HTTP client for the configured collection
    pub fn store(&self) -> Result<HttpRemoteStore, HttpStoreError> {
        let store = &self.config.store;
        Ok(
            HttpRemoteStore::new(&store.url, &store.collection)?
                .with_poll_interval(Duration::from_secs(store.poll_interval_secs)),
        )
    }

    /// Simulated platform for the configured device
    pub fn location_service(&self) -> Arc<SimulatedLocationService> {
        Arc::new(SimulatedLocationService::from_config(&self.config.device))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, StateError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}
