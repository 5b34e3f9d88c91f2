//! Risk scoring and health classification
//!
//! Three independent strict threshold checks contribute fixed weights:
//! high-frequency ratio +50, RMS variance +25, impulse density +25.

use crate::model::{FeatureVector, HealthStatus, ThresholdProfile};

const HIGH_FREQ_WEIGHT: u8 = 50;
const RMS_VARIANCE_WEIGHT: u8 = 25;
const IMPULSE_WEIGHT: u8 = 25;

/// Lowest score classified as Critical
const CRITICAL_SCORE: u8 = 70;
/// Lowest score classified as Warning
const WARNING_SCORE: u8 = 40;

pub const CRITICAL_ADVICE: &str = "stop use, inspect immediately.";
pub const WARNING_ADVICE: &str = "limit use, schedule inspection.";
pub const HEALTHY_ADVICE: &str = "normal operation.";

/// Score, tier and advice for one feature vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub risk_score: u8,
    pub status: HealthStatus,
    pub advice: &'static str,
}

/// Weighted sum of threshold exceedances (0, 25, 50, 75 or 100)
pub fn risk_score(features: &FeatureVector, profile: &ThresholdProfile) -> u8 {
    let mut score = 0;
    if features.high_freq_ratio > profile.high_freq_ratio_threshold {
        score += HIGH_FREQ_WEIGHT;
    }
    if features.rms_variance > profile.rms_variance_threshold {
        score += RMS_VARIANCE_WEIGHT;
    }
    if features.impulse_density > profile.impulse_density_threshold {
        score += IMPULSE_WEIGHT;
    }
    score
}

/// Map a risk score to its tier and advice
pub fn tier(risk_score: u8) -> (HealthStatus, &'static str) {
    if risk_score >= CRITICAL_SCORE {
        (HealthStatus::Critical, CRITICAL_ADVICE)
    } else if risk_score >= WARNING_SCORE {
        (HealthStatus::Warning, WARNING_ADVICE)
    } else {
        (HealthStatus::Healthy, HEALTHY_ADVICE)
    }
}

/// Classify a feature vector against a threshold profile
pub fn classify(features: &FeatureVector, profile: &ThresholdProfile) -> Classification {
    let risk_score = risk_score(features, profile);
    let (status, advice) = tier(risk_score);

    Classification {
        risk_score,
        status,
        advice,
    }
}
