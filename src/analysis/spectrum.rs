//! Short-time Fourier transform and mel spectrogram
//!
//! The magnitude STFT feeds the high-frequency ratio directly; its power is
//! projected onto a mel filter bank to build the log-power mel spectrogram
//! used for onset detection and handed to external visualizers.

use super::signal::frame_count;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Floor applied to power values before taking the logarithm
const POWER_FLOOR: f64 = 1e-10;
/// Dynamic range kept below the spectrogram maximum
const TOP_DB: f32 = 80.0;

/// Magnitude spectrogram, one spectrum per frame
#[derive(Debug, Clone)]
pub struct MagnitudeSpectrogram {
    /// Magnitudes per frame, each `n_fft / 2 + 1` bins long
    pub frames: Vec<Vec<f32>>,
    pub n_fft: usize,
    pub sample_rate: u32,
}

impl MagnitudeSpectrogram {
    /// Number of frequency bins per frame
    pub fn bin_count(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Centre frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / self.n_fft as f64
    }
}

/// STFT processor with a pre-computed periodic Hann window
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let window = (0..n_fft)
            .map(|i| {
                0.5 * (1.0 - ((2.0 * std::f64::consts::PI * i as f64) / n_fft as f64).cos())
                    as f32
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length,
            window,
            fft,
        }
    }

    /// Compute the magnitude spectrogram of a signal
    ///
    /// A signal shorter than `n_fft` is zero-padded into a single frame.
    pub fn magnitude(&self, samples: &[f32], sample_rate: u32) -> MagnitudeSpectrogram {
        let count = frame_count(samples.len(), self.n_fft, self.hop_length);
        let bins = self.n_fft / 2 + 1;
        let mut frames = Vec::with_capacity(count);
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.n_fft];

        for i in 0..count {
            let start = i * self.hop_length;
            let end = (start + self.n_fft).min(samples.len());
            let chunk = &samples[start..end];

            for (j, slot) in buffer.iter_mut().enumerate() {
                let sample = chunk.get(j).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[j], 0.0);
            }

            self.fft.process(&mut buffer);

            frames.push(buffer[..bins].iter().map(|c| c.norm()).collect());
        }

        MagnitudeSpectrogram {
            frames,
            n_fft: self.n_fft,
            sample_rate,
        }
    }
}

/// Log-power mel spectrogram (dB relative to its maximum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelSpectrogram {
    /// One row per mel band (lowest first), one column per frame
    pub bands: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub hop_length: usize,
}

impl MelSpectrogram {
    /// Project a magnitude spectrogram onto `n_mels` bands and convert to dB
    pub fn from_magnitude(spec: &MagnitudeSpectrogram, n_mels: usize, hop_length: usize) -> Self {
        let filters = mel_filter_bank(spec.sample_rate, spec.n_fft, n_mels);
        let frame_total = spec.frames.len();

        let mut power = vec![vec![0.0f64; frame_total]; n_mels];
        for (t, frame) in spec.frames.iter().enumerate() {
            for (m, weights) in filters.iter().enumerate() {
                power[m][t] = weights
                    .iter()
                    .zip(frame.iter())
                    .map(|(&w, &mag)| w * (mag as f64) * (mag as f64))
                    .sum();
            }
        }

        let reference = power
            .iter()
            .flat_map(|row| row.iter().copied())
            .fold(0.0f64, f64::max);

        Self {
            bands: power_to_db(&power, reference),
            sample_rate: spec.sample_rate,
            hop_length,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.bands.len()
    }

    pub fn frame_count(&self) -> usize {
        self.bands.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Start time of frame `t` in seconds
    pub fn frame_time(&self, t: usize) -> f64 {
        (t * self.hop_length) as f64 / self.sample_rate as f64
    }
}

/// Convert power to decibels relative to `reference`, keeping `TOP_DB` of range
fn power_to_db(power: &[Vec<f64>], reference: f64) -> Vec<Vec<f32>> {
    let ref_db = 10.0 * reference.max(POWER_FLOOR).log10();

    let mut db: Vec<Vec<f32>> = power
        .iter()
        .map(|row| {
            row.iter()
                .map(|&p| (10.0 * p.max(POWER_FLOOR).log10() - ref_db) as f32)
                .collect()
        })
        .collect();

    let max_db = db
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = max_db - TOP_DB;

    for value in db.iter_mut().flat_map(|row| row.iter_mut()) {
        if *value < floor {
            *value = floor;
        }
    }

    db
}

/// Slaney-style mel scale: linear below 1 kHz, logarithmic above
fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters from 0 Hz to Nyquist, area-normalized
fn mel_filter_bank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let max_mel = hz_to_mel(sample_rate as f64 / 2.0);
    let edges: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, centre, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (centre - left);
                    let upper = (right - f) / (right - centre);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}
