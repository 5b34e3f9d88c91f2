use super::EngineType;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health tier derived from the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING: ABNORMAL NOISE",
            HealthStatus::Critical => "CRITICAL: KNOCKING",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three diagnostic features of one sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Variance of the per-frame RMS sequence
    pub rms_variance: f64,

    /// Mean 2-6 kHz magnitude over mean full-spectrum magnitude
    pub high_freq_ratio: f64,

    /// Onsets per second of signal
    pub impulse_density: f64,
}

/// One completed analysis, as shown to users and stored in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// When the analysis ran
    pub timestamp: DateTime<Local>,

    /// File name of the analyzed source
    pub source_name: String,

    pub engine_type: EngineType,

    pub status: HealthStatus,

    /// Weighted sum of threshold exceedances: 0, 25, 50, 75 or 100
    pub risk_score: u8,

    #[serde(flatten)]
    pub features: FeatureVector,

    pub advice: String,
}

impl AnalysisRecord {
    /// One-line summary for history listings
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} | Risk: {} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.status,
            self.risk_score,
            self.source_name
        )
    }

    /// Field name / value pairs in display order
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date", self.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            ("file", self.source_name.clone()),
            ("engine", self.engine_type.to_string()),
            ("status", self.status.to_string()),
            ("risk_score", self.risk_score.to_string()),
            ("rms_variance", format!("{:.6}", self.features.rms_variance)),
            ("hf_ratio", format!("{:.4}", self.features.high_freq_ratio)),
            (
                "impulse_density",
                format!("{:.3}", self.features.impulse_density),
            ),
            ("advice", self.advice.clone()),
        ]
    }
}
