//! Waveform loading trait and sample container

use crate::error::Result;
use std::path::Path;

/// Waveform loader trait - allows swapping the decoder (or a synthetic source in tests)
pub trait WaveformLoader {
    /// Decode an audio source into mono samples
    fn load(&self, source: &Path) -> Result<Waveform>;
}

/// Mono sample sequence with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds (0 when the sample rate is 0)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Scale samples so the peak magnitude is 1.0
    ///
    /// Silence (peak 0) is left unchanged.
    pub fn normalize(&mut self) {
        let peak = self.peak();
        if peak > 0.0 && peak.is_finite() {
            for sample in &mut self.samples {
                *sample /= peak;
            }
        }
    }
}
