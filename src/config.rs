//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local runs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default proximity threshold used for every achievement registration.
pub const DEFAULT_TRIGGER_RADIUS_M: f64 = 50.0;

/// Default interval between achievement recalculation ticks.
pub const DEFAULT_RECALC_INTERVAL_SECS: u64 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the JSON key/value store holding destinations and achievements
    pub store_path: PathBuf,
    /// Trigger radius for achievement proximity registrations (meters)
    pub trigger_radius_m: f64,
    /// Interval of the recalculation tick while achievements are visible
    pub recalc_interval: Duration,
    /// Optional file of recorded location fixes to replay
    pub fixes_path: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("compass_state.json"),
            trigger_radius_m: DEFAULT_TRIGGER_RADIUS_M,
            recalc_interval: Duration::from_secs(DEFAULT_RECALC_INTERVAL_SECS),
            fixes_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let trigger_radius_m = match env::var("COMPASS_TRIGGER_RADIUS_M") {
            Ok(v) => {
                let radius: f64 = v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("COMPASS_TRIGGER_RADIUS_M", v.clone()))?;
                if !radius.is_finite() || radius < 0.0 {
                    return Err(ConfigError::Invalid("COMPASS_TRIGGER_RADIUS_M", v));
                }
                radius
            }
            Err(_) => DEFAULT_TRIGGER_RADIUS_M,
        };

        let recalc_secs = match env::var("COMPASS_RECALC_INTERVAL_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("COMPASS_RECALC_INTERVAL_SECS", v))?,
            Err(_) => DEFAULT_RECALC_INTERVAL_SECS,
        };

        Ok(Self {
            store_path: env::var("COMPASS_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("compass_state.json")),
            trigger_radius_m,
            recalc_interval: Duration::from_secs(recalc_secs),
            fixes_path: env::var("COMPASS_FIXES_PATH").ok().map(PathBuf::from),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
