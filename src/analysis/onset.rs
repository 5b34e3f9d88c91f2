//! Spectral flux onset detection over a log-power mel spectrogram
//!
//! The strength of frame `t` is the mean over mel bands of the positive dB
//! rise from frame `t - 1`, with every band floored at `ONSET_RANGE_DB` below
//! the spectrogram peak. The envelope is shifted to a minimum of 0 and scaled
//! by `max(envelope max, MIN_STRENGTH_DB)`. A frame is an onset when it equals
//! the moving max over `[t - pre_max, t]`, reaches the moving mean over
//! `[t - pre_avg, t + post_avg)` plus `delta`, and lies more than `wait`
//! frames after the previous onset.

use super::spectrum::MelSpectrogram;

/// Bands more than this far below the peak do not contribute to the flux
///
/// Near the floor, leakage from neighbouring partials beats from frame to
/// frame even for perfectly steady signals.
const ONSET_RANGE_DB: f32 = 50.0;

/// Envelope normalization floor in dB of mean band rise
///
/// Ripple from steady signals stays well below this; dividing it by its own
/// maximum would turn it into full-scale peaks.
const MIN_STRENGTH_DB: f32 = 6.0;

/// Peak-picking parameters derived from the frame rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetDetector {
    pre_max: usize,
    pre_avg: usize,
    post_avg: usize,
    wait: usize,
    delta: f32,
}

impl OnsetDetector {
    /// Create a detector for a spectrogram with the given sample rate and hop
    pub fn new(sample_rate: u32, hop_length: usize) -> Self {
        let frames_per_sec = sample_rate as f64 / hop_length.max(1) as f64;
        let frames = |secs: f64| (secs * frames_per_sec).floor() as usize;

        Self {
            pre_max: frames(0.03),
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            wait: frames(0.03),
            delta: 0.07,
        }
    }

    /// Onset strength envelope, normalized to [0, 1]
    pub fn envelope(&self, mel: &MelSpectrogram) -> Vec<f32> {
        let frame_total = mel.frame_count();
        let n_mels = mel.n_mels();
        let mut envelope = vec![0.0f32; frame_total];

        if n_mels == 0 {
            return envelope;
        }

        let peak = mel
            .bands
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - ONSET_RANGE_DB;

        for (t, value) in envelope.iter_mut().enumerate().skip(1) {
            let rise: f64 = mel
                .bands
                .iter()
                .map(|row| (row[t].max(floor) - row[t - 1].max(floor)).max(0.0) as f64)
                .sum();
            *value = (rise / n_mels as f64) as f32;
        }

        let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
        let min = if min.is_finite() { min } else { 0.0 };
        let max = envelope.iter().map(|v| v - min).fold(0.0f32, f32::max);
        let scale = max.max(MIN_STRENGTH_DB);

        for value in &mut envelope {
            *value = (*value - min) / scale;
        }

        envelope
    }

    /// Frame indices of detected onsets
    pub fn detect(&self, mel: &MelSpectrogram) -> Vec<usize> {
        let envelope = self.envelope(mel);
        self.pick_peaks(&envelope)
    }

    /// Pick peaks in a normalized onset envelope
    fn pick_peaks(&self, envelope: &[f32]) -> Vec<usize> {
        let mut peaks: Vec<usize> = Vec::new();
        let len = envelope.len();

        for (i, &value) in envelope.iter().enumerate() {
            let max_start = i.saturating_sub(self.pre_max);
            let local_max = envelope[max_start..=i]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if value < local_max {
                continue;
            }

            let avg_start = i.saturating_sub(self.pre_avg);
            let avg_end = (i + self.post_avg).min(len);
            let window = &envelope[avg_start..avg_end];
            let local_mean = window.iter().sum::<f32>() / window.len() as f32;
            if value < local_mean + self.delta {
                continue;
            }

            if let Some(&last) = peaks.last() {
                if i <= last + self.wait {
                    continue;
                }
            }

            peaks.push(i);
        }

        peaks
    }
}
