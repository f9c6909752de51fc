//! Process configuration.
//!
//! Loaded once from a JSON file at startup and handed to each component's
//! constructor. Nothing reads configuration from global state.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::StopCode;

/// Fatal configuration problems, reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),

    /// None of the configured stop codes exist in the static feed
    #[error("none of the configured stop codes {codes:?} match a stop in the static feed")]
    NoMatchingStops { codes: Vec<StopCode> },
}

/// Static GTFS archive location.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFeedConfig {
    /// Where to download the archive from. When absent the local file is
    /// used as-is.
    #[serde(default)]
    pub url: Option<String>,

    /// Local path of the archive.
    pub path: PathBuf,
}

/// GTFS-Realtime endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    pub url: String,

    /// Sent as the `x-api-key` header. Empty means "read `example_file`".
    #[serde(default)]
    pub api_key: String,

    /// Feed snapshot used instead of the endpoint when no API key is set.
    #[serde(default)]
    pub example_file: Option<PathBuf>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One stop shown on the board.
#[derive(Debug, Clone, Deserialize)]
pub struct StopConfig {
    pub stop_code: StopCode,

    /// Minutes it takes to walk to this stop.
    #[serde(default)]
    pub walk_time_mins: i64,

    /// Route short names to show at this stop. Empty shows every route.
    #[serde(default)]
    pub routes: Vec<String>,
}

/// HTTP board settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_listen(),
            static_dir: default_static_dir(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub static_feed: StaticFeedConfig,

    pub realtime: RealtimeConfig,

    pub stops: Vec<StopConfig>,

    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Number of arrivals published per refresh.
    #[serde(default = "default_display_lines")]
    pub display_lines: usize,

    /// How many times `display_lines` candidates to project before
    /// cancellations and route filtering thin them out.
    #[serde(default = "default_candidate_factor")]
    pub candidate_factor: usize,

    /// Pending boards kept for a slow consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    /// Read and validate the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.stops.is_empty() {
            return Err(ConfigurationError::Invalid(
                "at least one stop must be configured".to_string(),
            ));
        }
        if self.update_interval_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "update_interval_secs must be positive".to_string(),
            ));
        }
        if self.display_lines == 0 {
            return Err(ConfigurationError::Invalid(
                "display_lines must be positive".to_string(),
            ));
        }
        if self.candidate_factor < 2 {
            return Err(ConfigurationError::Invalid(
                "candidate_factor must be at least 2".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigurationError::Invalid(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Override the realtime API key, e.g. from the environment.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.realtime.api_key = key;
        }
        self
    }

    pub fn stop_codes(&self) -> Vec<StopCode> {
        self.stops.iter().map(|s| s.stop_code.clone()).collect()
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Number of scheduled visits to project per refresh.
    pub fn candidate_count(&self) -> usize {
        self.display_lines * self.candidate_factor
    }

    /// Walking minutes per stop code.
    pub fn walk_time_by_stop(&self) -> HashMap<StopCode, i64> {
        self.stops
            .iter()
            .map(|s| (s.stop_code.clone(), s.walk_time_mins))
            .collect()
    }

    /// Allowed route names per stop code, for stops that list any.
    pub fn routes_for_stops(&self) -> HashMap<StopCode, HashSet<String>> {
        let mut result: HashMap<StopCode, HashSet<String>> = HashMap::new();
        for stop in &self.stops {
            if stop.routes.is_empty() {
                continue;
            }
            result
                .entry(stop.stop_code.clone())
                .or_default()
                .extend(stop.routes.iter().cloned());
        }
        result
    }
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_update_interval_secs() -> u64 {
    60
}

fn default_display_lines() -> usize {
    5
}

fn default_candidate_factor() -> usize {
    3
}

fn default_channel_capacity() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
