//! Data model for engine diagnostics
//!
//! Types shared by the analysis pipeline, the history store and front ends.

mod engine;
mod record;

pub use engine::{EngineType, ThresholdProfile};
pub use record::{AnalysisRecord, FeatureVector, HealthStatus};
