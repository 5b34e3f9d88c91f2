//! Per-engine threshold profiles

use crate::model::{EngineType, ThresholdProfile};

/// Gasoline engines
pub const GASOLINE: ThresholdProfile = ThresholdProfile {
    rms_variance_threshold: 0.0003,
    high_freq_ratio_threshold: 0.35,
    impulse_density_threshold: 3.0,
};

/// Diesel engines run rougher, so every limit is looser
pub const DIESEL: ThresholdProfile = ThresholdProfile {
    rms_variance_threshold: 0.0005,
    high_freq_ratio_threshold: 0.40,
    impulse_density_threshold: 4.0,
};

/// Profile for engine types without their own tuning (same as gasoline)
pub const DEFAULT: ThresholdProfile = GASOLINE;

/// Threshold profile for an engine type; unknown types get [`DEFAULT`]
pub fn lookup(engine: &EngineType) -> ThresholdProfile {
    match engine {
        EngineType::Gasoline => GASOLINE,
        EngineType::Diesel => DIESEL,
        EngineType::Other(tag) => {
            log::debug!("No thresholds for engine type {:?}, using default", tag);
            DEFAULT
        }
    }
}
