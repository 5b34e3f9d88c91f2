//! Acoustic analysis layer
//!
//! Decoding sits behind the `WaveformLoader` trait so front ends and tests
//! can supply samples from anywhere. Feature extraction, threshold lookup
//! and risk classification are pure functions of the samples.

pub mod classifier;
mod decoder;
mod features;
mod onset;
mod resample;
mod signal;
mod spectrum;
pub mod thresholds;
mod traits;

pub use classifier::{classify, Classification};
pub use decoder::SymphoniaLoader;
pub use features::{Extraction, ExtractorConfig, FeatureExtractor, ANALYSIS_SAMPLE_RATE};
pub use onset::OnsetDetector;
pub use spectrum::MelSpectrogram;
pub use traits::{Waveform, WaveformLoader};
