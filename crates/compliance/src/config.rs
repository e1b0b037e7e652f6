//! Compliance configuration
//!
//! Every risk coefficient is configurable via file; only the qualitative
//! ordering of signals is fixed in code.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, ComplianceResult};

/// Configuration for the Compliance Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    // === Velocity ===
    /// Rolling window over which prior assessments add velocity risk
    #[serde(default = "default_velocity_window_secs")]
    pub velocity_window_secs: i64,

    /// Points added by a prior assessment made just now (decays linearly to
    /// zero across the window)
    #[serde(default = "default_velocity_weight")]
    pub velocity_weight: u32,

    // === Magnitude ===
    /// Values above this add magnitude risk
    #[serde(default = "default_magnitude_threshold")]
    pub magnitude_threshold: Decimal,

    /// Points per multiple of the threshold
    #[serde(default = "default_magnitude_weight")]
    pub magnitude_weight: u32,

    /// Largest multiple of the threshold that is scored
    #[serde(default = "default_magnitude_cap")]
    pub magnitude_cap: Decimal,

    // === Payload ===
    /// Bytes per payload size unit
    #[serde(default = "default_payload_unit_bytes")]
    pub payload_unit_bytes: usize,

    /// Points per payload size unit
    #[serde(default = "default_payload_size_weight")]
    pub payload_size_weight: u32,

    /// Maximum points from payload size
    #[serde(default = "default_payload_size_cap")]
    pub payload_size_cap: u32,

    /// Points added when a non-empty payload is not valid JSON
    #[serde(default = "default_payload_unstructured_weight")]
    pub payload_unstructured_weight: u32,

    // === History ===
    /// Assessments kept per principal
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_velocity_window_secs() -> i64 {
    3600
}

fn default_velocity_weight() -> u32 {
    10
}

fn default_magnitude_threshold() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_magnitude_weight() -> u32 {
    10
}

fn default_magnitude_cap() -> Decimal {
    Decimal::new(5, 0)
}

fn default_payload_unit_bytes() -> usize {
    1024
}

fn default_payload_size_weight() -> u32 {
    2
}

fn default_payload_size_cap() -> u32 {
    20
}

fn default_payload_unstructured_weight() -> u32 {
    10
}

fn default_history_limit() -> usize {
    256
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            velocity_window_secs: default_velocity_window_secs(),
            velocity_weight: default_velocity_weight(),
            magnitude_threshold: default_magnitude_threshold(),
            magnitude_weight: default_magnitude_weight(),
            magnitude_cap: default_magnitude_cap(),
            payload_unit_bytes: default_payload_unit_bytes(),
            payload_size_weight: default_payload_size_weight(),
            payload_size_cap: default_payload_size_cap(),
            payload_unstructured_weight: default_payload_unstructured_weight(),
            history_limit: default_history_limit(),
        }
    }
}

impl ComplianceConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> ComplianceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ComplianceResult<()> {
        if self.velocity_window_secs <= 0 {
            return Err(ComplianceError::ConfigError(
                "velocity_window_secs must be positive".to_string(),
            ));
        }
        if self.magnitude_threshold <= Decimal::ZERO {
            return Err(ComplianceError::ConfigError(
                "magnitude_threshold must be positive".to_string(),
            ));
        }
        if self.magnitude_cap < Decimal::ONE {
            return Err(ComplianceError::ConfigError(
                "magnitude_cap must be at least 1".to_string(),
            ));
        }
        if self.payload_unit_bytes == 0 {
            return Err(ComplianceError::ConfigError(
                "payload_unit_bytes must be positive".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ComplianceError::ConfigError(
                "history_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Velocity window as chrono Duration
    pub fn velocity_window(&self) -> Duration {
        Duration::try_seconds(self.velocity_window_secs).unwrap_or(Duration::MAX)
    }
}
