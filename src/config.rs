//! # Configuration Management Module
//!
//! Persistent monitor settings stored in platform-appropriate locations.
//! Handles loading, saving, validating and providing defaults.
//!
//! ## Settings
//! - Acquisition: `sample_interval_ms`, `threshold_window_samples`, `rate_update_samples`
//! - Plausibility band: `min_bpm`, `max_bpm`
//! - Sessions: `local_session_secs`, `cloud_session_secs`, minimum interval counts,
//!   `warmup_timeout_ms`, `cloud_reply_timeout_secs`
//! - Input: `debounce_ms`
//! - Cloud topics and host-emulation parameters (`simulated_*`)
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/pulse-hrv/config.toml
//! - Linux: ~/.config/pulse-hrv/config.toml
//! - Windows: %APPDATA%\pulse-hrv\config.toml
//!
//! Every field has a default, so a partial file only overrides what it names.

use crate::error::ConfigError;
use crate::intervals::IntervalBand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sample_interval_ms: u32,
    pub threshold_window_samples: usize,
    pub rate_update_samples: usize,
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub local_session_secs: u32,
    pub cloud_session_secs: u32,
    pub local_min_intervals: usize,
    pub cloud_min_intervals: usize,
    pub debounce_ms: u32,
    pub warmup_timeout_ms: u64,
    pub cloud_reply_timeout_secs: u64,
    pub request_topic: String,
    pub response_topic: String,
    pub simulated_heart_rate_bpm: f64,
    pub simulated_variability_ms: f64,
    pub simulated_analyzer_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_interval_ms: 4,
            threshold_window_samples: 250,
            rate_update_samples: 1250,
            min_bpm: 40,
            max_bpm: 200,
            local_session_secs: 7,
            cloud_session_secs: 30,
            local_min_intervals: 1,
            cloud_min_intervals: 10,
            debounce_ms: 150,
            warmup_timeout_ms: 5_000,
            cloud_reply_timeout_secs: 20,
            request_topic: "hrv/analysis/request".to_string(),
            response_topic: "hrv/analysis/response".to_string(),
            simulated_heart_rate_bpm: 72.0,
            simulated_variability_ms: 30.0,
            simulated_analyzer_latency_ms: 800,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulse-hrv")
            .join("config.toml")
    }

    /// Load config from the default location, or create default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing defaults there if the file is missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to the default location
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_path())
    }

    /// Save config to `path`
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample_interval_ms must be positive".into()));
        }
        if self.threshold_window_samples == 0 || self.rate_update_samples == 0 {
            return Err(ConfigError::Invalid(
                "threshold_window_samples and rate_update_samples must be positive".into(),
            ));
        }
        if self.min_bpm == 0 || self.min_bpm >= self.max_bpm {
            return Err(ConfigError::Invalid(format!(
                "min_bpm ({}) must be positive and below max_bpm ({})",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.budget_samples(self.local_session_secs).is_none()
            || self.budget_samples(self.cloud_session_secs).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "session lengths ({} s local, {} s cloud) are too long to count in samples",
                self.local_session_secs, self.cloud_session_secs
            )));
        }
        let band = self.interval_band();
        if band.min_samples + 1 >= band.max_samples {
            return Err(ConfigError::Invalid(format!(
                "sample_interval_ms ({}) is too coarse to resolve {}-{} bpm",
                self.sample_interval_ms, self.min_bpm, self.max_bpm
            )));
        }
        Ok(())
    }

    pub fn interval_band(&self) -> IntervalBand {
        IntervalBand::from_bpm(self.sample_interval_ms, self.min_bpm, self.max_bpm)
    }

    fn budget_samples(&self, secs: u32) -> Option<u32> {
        secs.checked_mul(1000)
            .map(|ms| ms / self.sample_interval_ms.max(1))
    }

    pub fn local_budget_samples(&self) -> u32 {
        self.budget_samples(self.local_session_secs).unwrap_or(u32::MAX)
    }

    pub fn cloud_budget_samples(&self) -> u32 {
        self.budget_samples(self.cloud_session_secs).unwrap_or(u32::MAX)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms as u64)
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud_reply_timeout_secs)
    }
}
