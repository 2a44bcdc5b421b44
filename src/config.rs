//! User settings persisted as JSON in the platform config directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PadSize, ShipProfile, StationFilter};
use crate::infra::cache::{DatasetCache, DEFAULT_TTL};
use crate::infra::eddb::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

const APP_QUALIFIER: &str = "io";
const APP_ORG: &str = "edtp";
const APP_NAME: &str = "edtp";
const CONFIG_FILENAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory unavailable")]
    StorageUnavailable,
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ship: ShipProfile,
    pub data_url: String,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_hours: u64,
    pub request_timeout_secs: u64,
    pub max_jumps_per_hop: u32,
    /// Light seconds.
    pub max_star_distance: Option<f64>,
    pub allow_planetary: bool,
    pub max_age_days: Option<u32>,
    pub beam_width: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ship: ShipProfile::default(),
            data_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: None,
            cache_ttl_hours: DEFAULT_TTL.as_secs() / 3600,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_jumps_per_hop: 2,
            max_star_distance: None,
            allow_planetary: true,
            max_age_days: None,
            beam_width: 200,
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 60 * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_days
            .map(|days| Duration::from_secs(days as u64 * 86_400))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(DatasetCache::default_dir)
    }

    pub fn station_filter(&self) -> StationFilter {
        StationFilter {
            pad_size: self.ship.pad_size,
            max_star_distance: self.max_star_distance,
            allow_planetary: self.allow_planetary,
        }
    }
}

/// Per-invocation ship values that win over the saved profile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShipOverrides {
    pub capacity: Option<u32>,
    pub credits: Option<u64>,
    pub jump_range: Option<f64>,
    pub pad_size: Option<PadSize>,
}

impl ShipOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, ship: &mut ShipProfile) {
        if let Some(capacity) = self.capacity {
            ship.capacity = capacity;
        }
        if let Some(credits) = self.credits {
            ship.credits = credits;
        }
        if let Some(jump_range) = self.jump_range {
            ship.jump_range = jump_range;
        }
        if let Some(pad_size) = self.pad_size {
            ship.pad_size = pad_size;
        }
    }
}

/// `explicit` (from `--config` or `EDTP_CONFIG`), else the platform config dir.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
        .ok_or(ConfigError::StorageUnavailable)
}

/// A missing file yields the defaults; anything unreadable is an error.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("[config] No settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(io_error)?;
    log::info!("[config] Saved settings to {}", path.display());
    Ok(())
}
