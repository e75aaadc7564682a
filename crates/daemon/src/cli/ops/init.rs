use std::fmt;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use url::Url;

use checkin_daemon::state::{AppConfig, AppState, DEFAULT_COLLECTION, DEFAULT_STORE_URL};
use common::monitor::ResyncStrategy;

/// Region resync strategy for CLI selection
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Strategy {
    /// Stop every region and start them all again (default)
    #[default]
    Full,
    /// Only stop removed regions and start new or changed ones
    Diff,
}

impl From<Strategy> for ResyncStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Full => ResyncStrategy::Full,
            Strategy::Diff => ResyncStrategy::Diff,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Base url of the document store
    #[arg(long, default_value = DEFAULT_STORE_URL)]
    pub store_url: Url,

    /// Collection holding event location documents
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Seconds between polls for remote changes while watching
    #[arg(long, default_value = "5")]
    pub poll_interval_secs: u64,

    /// Simulated device latitude
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub latitude: f64,

    /// Simulated device longitude
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub longitude: f64,

    /// Largest region radius in meters the simulated device will monitor
    #[arg(long)]
    pub max_distance: Option<f64>,

    /// Region resync strategy
    #[arg(long, value_enum, default_value_t = Strategy::Full)]
    pub strategy: Strategy,
}

#[derive(Debug)]
pub struct InitOutput {
    pub app_dir: PathBuf,
    pub config_path: PathBuf,
    pub store_url: Url,
    pub collection: String,
    pub max_distance: f64,
}

impl fmt::Display for InitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} checkin at {}",
            "Initialized".green().bold(),
            self.app_dir.display().to_string().bold()
        )?;
        writeln!(f, "  {} {}", "Config:".dimmed(), self.config_path.display())?;
        writeln!(f, "  {} {}", "Store:".dimmed(), self.store_url)?;
        writeln!(f, "  {} {}", "Collection:".dimmed(), self.collection)?;
        write!(f, "  {} {} m", "Max radius:".dimmed(), self.max_distance)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] checkin_daemon::state::StateError),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl Init {
    fn build_config(&self) -> Result<AppConfig, InitError> {
        let mut config = AppConfig::new(self.store_url.clone());
        config.store.collection = self.collection.clone();
        config.store.poll_interval_secs = self.poll_interval_secs;
        config.sync.resync_strategy = self.strategy.into();
        config.device.latitude = self.latitude;
        config.device.longitude = self.longitude;

        if let Some(max_distance) = self.max_distance {
            if !max_distance.is_finite() || max_distance <= 0.0 {
                return Err(InitError::InvalidValue(
                    "--max-distance must be a positive number of meters".to_string(),
                ));
            }
            config.device.max_monitoring_distance = max_distance;
        }
        Ok(config)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = InitOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.build_config()?;
        let state = AppState::init(ctx.config_path.clone(), config)?;

        Ok(InitOutput {
            app_dir: state.app_dir,
            config_path: state.config_path,
            store_url: state.config.store.url,
            collection: state.config.store.collection,
            max_distance: state.config.device.max_monitoring_distance,
        })
    }
}
