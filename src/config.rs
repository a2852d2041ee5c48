//! Engine configuration parameters
//!
//! All tunable parameters for the acquisition engine. Values come from an
//! optional JSON file; every field falls back to its default.

use core::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// When the daily log receives a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowTrigger {
    /// One row per accepted frame once both facilities have a thermal sample.
    EveryFrame,
    /// One row each time both facilities have committed a frame since the
    /// previous row.
    FreshPair,
}

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Link ---
    /// Serial device shared by both facility controllers
    pub serial_port: String,
    /// Line speed in baud
    pub baud_rate: u32,
    /// GPIO driving the transceiver direction (BCM numbering); `None` for
    /// adapters that switch direction automatically
    pub direction_gpio: Option<u32>,

    // --- Timing ---
    /// Hold before and after the request byte (milliseconds)
    pub settle_ms: u32,
    /// Transmit + receive ceiling per cycle (milliseconds)
    pub cycle_budget_ms: u32,
    /// Maximum age of the last frame for the link to count as live (milliseconds)
    pub liveness_window_ms: u32,

    // --- Persistence ---
    /// Directory holding the `MM-DD-YYYY.csv` daily logs
    pub data_dir: PathBuf,
    /// Row emission policy
    pub row_trigger: RowTrigger,

    // --- Reporting ---
    /// Period of the headless status report (milliseconds)
    pub status_interval_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Link
            serial_port: "/dev/ttyAMA0".to_string(),
            baud_rate: 115_200,
            direction_gpio: Some(23), // header pin 16

            // Timing
            settle_ms: 5,
            cycle_budget_ms: 90,
            liveness_window_ms: 2_000,

            // Persistence
            data_dir: PathBuf::from("/home/GTL/HealthMonitorData"),
            row_trigger: RowTrigger::EveryFrame,

            // Reporting
            status_interval_ms: 1_000, // 1 Hz
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound)?;
        let config: Self = serde_json::from_str(&text).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the polling loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial_port.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("serial_port is empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationFailed("baud_rate must be > 0"));
        }
        if self.cycle_budget_ms == 0 {
            return Err(ConfigError::ValidationFailed("cycle_budget_ms must be > 0"));
        }
        if 2 * self.settle_ms >= self.cycle_budget_ms {
            return Err(ConfigError::ValidationFailed(
                "2 * settle_ms must leave room in cycle_budget_ms",
            ));
        }
        if self.liveness_window_ms == 0 {
            return Err(ConfigError::ValidationFailed("liveness_window_ms must be > 0"));
        }
        if self.status_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("status_interval_ms must be > 0"));
        }
        Ok(())
    }
}

/// Errors from loading or validating [`EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    NotFound,
    /// The file is not valid JSON for this schema.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config file not readable"),
            Self::Corrupted => write!(f, "config file corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
