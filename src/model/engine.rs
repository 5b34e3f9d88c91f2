use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Engine family of the recorded sample
///
/// Known families get their own tuned thresholds. Any other tag is kept
/// verbatim in `Other` and analyzed with the default profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineType {
    Gasoline,
    Diesel,
    Other(String),
}

impl EngineType {
    /// Parse a user-supplied tag (case-insensitive, never fails)
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_lowercase();
        match normalized.as_str() {
            "gasoline" | "petrol" | "benzinli" => EngineType::Gasoline,
            "diesel" | "dizel" => EngineType::Diesel,
            _ => EngineType::Other(tag.trim().to_string()),
        }
    }

    /// Canonical tag used in the history file
    pub fn tag(&self) -> &str {
        match self {
            EngineType::Gasoline => "gasoline",
            EngineType::Diesel => "diesel",
            EngineType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EngineType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl From<String> for EngineType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<EngineType> for String {
    fn from(engine: EngineType) -> Self {
        engine.tag().to_string()
    }
}

/// Feature limits for one engine family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdProfile {
    /// Variance of per-frame RMS above which loudness is considered irregular
    pub rms_variance_threshold: f64,

    /// 2-6 kHz magnitude ratio above which metallic/knock noise is suspected
    pub high_freq_ratio_threshold: f64,

    /// Onset events per second above which impulses are considered excessive
    pub impulse_density_threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_is_case_insensitive() {
        assert_eq!(EngineType::from_tag("Gasoline"), EngineType::Gasoline);
        assert_eq!(EngineType::from_tag(" DIESEL "), EngineType::Diesel);
        assert_eq!(EngineType::from_tag("Benzinli"), EngineType::Gasoline);
        assert_eq!(EngineType::from_tag("dizel"), EngineType::Diesel);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let engine = EngineType::from_tag("Rotary");
        assert_eq!(engine, EngineType::Other("Rotary".to_string()));
        assert_eq!(engine.tag(), "Rotary");
    }

    #[test]
    fn test_serializes_as_tag() {
        let json = serde_json::to_string(&EngineType::Diesel).unwrap();
        assert_eq!(json, "\"diesel\"");

        let parsed: EngineType = serde_json::from_str("\"hydrogen\"").unwrap();
        assert_eq!(parsed, EngineType::Other("hydrogen".to_string()));
    }
}
