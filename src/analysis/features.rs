//! Diagnostic feature extraction
//!
//! Computes the three scalar features used for risk scoring:
//! - RMS variance: irregularity of loudness over time (knocking, vibration)
//! - High-frequency ratio: 2-6 kHz magnitude share (metallic noise)
//! - Impulse density: onsets per second (percussive faults)
//!
//! Thresholds are calibrated at 22050 Hz, so every signal is resampled to
//! the analysis rate before any feature is computed.
//!
//! The log-power mel spectrogram computed along the way is returned as well,
//! so visualizers do not need to recompute the transform.

use super::onset::OnsetDetector;
use super::resample::Resampler;
use super::signal::{frames, rms, variance};
use super::spectrum::{MagnitudeSpectrogram, MelSpectrogram, Stft};
use super::traits::Waveform;
use crate::error::{DiagnosticError, Result};
use crate::model::FeatureVector;

/// Rate all features are computed at
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Fixed analysis parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Signals are resampled to this rate before extraction
    pub sample_rate: u32,
    /// RMS frame length in samples
    pub frame_length: usize,
    /// RMS hop in samples
    pub rms_hop: usize,
    /// STFT size
    pub n_fft: usize,
    /// STFT hop in samples
    pub stft_hop: usize,
    /// Mel bands in the spectrogram
    pub n_mels: usize,
    /// Lower edge of the high-frequency band in Hz (exclusive)
    pub band_low_hz: f64,
    /// Upper edge of the high-frequency band in Hz (exclusive)
    pub band_high_hz: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: ANALYSIS_SAMPLE_RATE,
            frame_length: 2048,
            rms_hop: 512,
            n_fft: 2048,
            stft_hop: 512,
            n_mels: 128,
            band_low_hz: 2000.0,
            band_high_hz: 6000.0,
        }
    }
}

/// Features plus the spectrogram they were derived from
#[derive(Debug, Clone)]
pub struct Extraction {
    pub features: FeatureVector,
    pub spectrogram: MelSpectrogram,
    /// Frame indices of detected onsets
    pub onset_frames: Vec<usize>,
}

/// Feature extractor with a pre-planned STFT
pub struct FeatureExtractor {
    config: ExtractorConfig,
    stft: Stft,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let config = ExtractorConfig {
            sample_rate: config.sample_rate.max(1),
            frame_length: config.frame_length.max(1),
            rms_hop: config.rms_hop.max(1),
            n_fft: config.n_fft.max(2),
            stft_hop: config.stft_hop.max(1),
            n_mels: config.n_mels.max(1),
            ..config
        };
        let stft = Stft::new(config.n_fft, config.stft_hop);

        Self { config, stft }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Bring a decoded waveform to the analysis rate, then to unit peak
    pub fn prepare(&self, waveform: Waveform) -> Result<Waveform> {
        validate(&waveform)?;
        let mut waveform = self.resample(waveform);
        waveform.normalize();
        Ok(waveform)
    }

    /// Extract features from a normalized waveform
    ///
    /// Waveforms at another rate are resampled first.
    pub fn extract(&self, waveform: &Waveform) -> Result<Extraction> {
        validate(waveform)?;

        let resampled;
        let waveform = if waveform.sample_rate == self.config.sample_rate {
            waveform
        } else {
            resampled = self.resample(waveform.clone());
            &resampled
        };

        let samples = &waveform.samples;
        let sample_rate = waveform.sample_rate;

        let rms_variance = self.rms_variance(samples);

        let magnitude = self.stft.magnitude(samples, sample_rate);
        let high_freq_ratio = self.high_freq_ratio(&magnitude);

        let spectrogram =
            MelSpectrogram::from_magnitude(&magnitude, self.config.n_mels, self.config.stft_hop);
        let onset_frames = OnsetDetector::new(sample_rate, self.config.stft_hop).detect(&spectrogram);
        let impulse_density = onset_frames.len() as f64 / waveform.duration_secs();

        log::debug!(
            "Features: rms_variance={:.6}, high_freq_ratio={:.4}, impulse_density={:.3} ({} onsets)",
            rms_variance,
            high_freq_ratio,
            impulse_density,
            onset_frames.len()
        );

        Ok(Extraction {
            features: FeatureVector {
                rms_variance,
                high_freq_ratio,
                impulse_density,
            },
            spectrogram,
            onset_frames,
        })
    }

    fn resample(&self, waveform: Waveform) -> Waveform {
        let target = self.config.sample_rate;
        if waveform.sample_rate == target {
            return waveform;
        }

        let resampler = Resampler::new(waveform.sample_rate, target);
        let samples = resampler.process(&waveform.samples);
        let (up, down) = resampler.ratio();
        log::debug!(
            "Resampled {} samples at {}Hz to {} samples at {}Hz (x{}/{})",
            waveform.samples.len(),
            waveform.sample_rate,
            samples.len(),
            target,
            up,
            down
        );

        Waveform::new(samples, target)
    }

    /// Variance of the per-frame RMS sequence
    fn rms_variance(&self, samples: &[f32]) -> f64 {
        let levels: Vec<f64> = frames(samples, self.config.frame_length, self.config.rms_hop)
            .map(rms)
            .collect();
        variance(&levels)
    }

    /// Mean in-band magnitude over mean full-spectrum magnitude
    fn high_freq_ratio(&self, spec: &MagnitudeSpectrogram) -> f64 {
        let band: Vec<usize> = (0..spec.bin_count())
            .filter(|&k| {
                let f = spec.bin_frequency(k);
                f > self.config.band_low_hz && f < self.config.band_high_hz
            })
            .collect();

        let mut total_sum = 0.0f64;
        let mut band_sum = 0.0f64;
        for frame in &spec.frames {
            total_sum += frame.iter().map(|&m| m as f64).sum::<f64>();
            band_sum += band.iter().map(|&k| frame[k] as f64).sum::<f64>();
        }

        let total_mean = total_sum / (spec.frames.len() * spec.bin_count()) as f64;
        if total_mean == 0.0 || band.is_empty() {
            return 0.0;
        }

        let band_mean = band_sum / (spec.frames.len() * band.len()) as f64;
        (band_mean / total_mean).min(1.0)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

fn validate(waveform: &Waveform) -> Result<()> {
    if waveform.sample_rate == 0 {
        return Err(DiagnosticError::InvalidSignal(
            "sample rate is zero".to_string(),
        ));
    }
    if waveform.samples.is_empty() {
        return Err(DiagnosticError::InvalidSignal(
            "signal contains no samples".to_string(),
        ));
    }
    if let Some(index) = waveform.samples.iter().position(|s| !s.is_finite()) {
        return Err(DiagnosticError::InvalidSignal(format!(
            "non-finite sample at index {}",
            index
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, sample_rate: u32, secs: f64) -> Waveform {
        let len = (secs * sample_rate as f64) as usize;
        let samples = (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin() as f32)
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn test_empty_signal_is_invalid() {
        let result = FeatureExtractor::default().extract(&Waveform::new(Vec::new(), 22050));
        assert!(matches!(result, Err(DiagnosticError::InvalidSignal(_))));
    }

    #[test]
    fn test_zero_sample_rate_is_invalid() {
        let result = FeatureExtractor::default().extract(&Waveform::new(vec![0.1; 100], 0));
        assert!(matches!(result, Err(DiagnosticError::InvalidSignal(_))));
    }

    #[test]
    fn test_nan_sample_is_invalid() {
        let result =
            FeatureExtractor::default().extract(&Waveform::new(vec![0.0, f32::NAN, 0.0], 8000));
        assert!(matches!(result, Err(DiagnosticError::InvalidSignal(_))));
    }

    #[test]
    fn test_silence_has_zero_features() {
        let extractor = FeatureExtractor::default();
        for len in [1usize, 100, 2048, 10_000, 44_100] {
            let extraction = extractor
                .extract(&Waveform::new(vec![0.0; len], 22050))
                .unwrap();
            let features = extraction.features;
            assert_eq!(features.high_freq_ratio, 0.0, "len {}", len);
            assert_eq!(features.rms_variance, 0.0);
            assert_eq!(features.impulse_density, 0.0);
        }
    }

    #[test]
    fn test_low_tone_is_quiet_in_high_band() {
        let extraction = FeatureExtractor::default()
            .extract(&tone(220.0, 22050, 2.0))
            .unwrap();
        let features = extraction.features;

        assert!(features.high_freq_ratio < 0.05, "{:?}", features);
        assert!(features.rms_variance < 1e-4, "{:?}", features);
        assert_eq!(features.impulse_density, 0.0);
    }

    #[test]
    fn test_band_tone_has_high_ratio() {
        let extraction = FeatureExtractor::default()
            .extract(&tone(3000.0, 22050, 2.0))
            .unwrap();
        assert!(extraction.features.high_freq_ratio > 0.35);
        assert!(extraction.features.high_freq_ratio <= 1.0);
    }

    /// Engine-like mix: firing harmonics plus two in-band whine components
    fn engine_mix(sample_rate: u32, secs: f64) -> Waveform {
        let partials = [
            (120.0, 0.5),
            (240.0, 0.3),
            (360.0, 0.2),
            (3000.0, 0.16),
            (4500.0, 0.12),
        ];
        let len = (secs * sample_rate as f64) as usize;
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                partials
                    .iter()
                    .map(|&(freq, amp)| amp * (2.0 * std::f64::consts::PI * freq * t).sin())
                    .sum::<f64>() as f32
            })
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn test_low_analysis_rate_has_no_band_bins() {
        // Nyquist is 1.5 kHz, so no bin falls inside the 2-6 kHz band
        let extractor = FeatureExtractor::new(ExtractorConfig {
            sample_rate: 3000,
            ..ExtractorConfig::default()
        });
        let extraction = extractor.extract(&tone(500.0, 3000, 1.0)).unwrap();
        assert_eq!(extraction.features.high_freq_ratio, 0.0);
    }

    #[test]
    fn test_features_do_not_depend_on_recording_rate() {
        let extractor = FeatureExtractor::default();
        let reference = extractor.extract(&engine_mix(22050, 3.0)).unwrap();

        println!("22050Hz features: {:?}", reference.features);
        assert!(reference.features.high_freq_ratio > 0.35);
        assert!(reference.features.high_freq_ratio < 1.0);
        assert_eq!(reference.features.impulse_density, 0.0);

        for rate in [44100, 48000] {
            let extraction = extractor.extract(&engine_mix(rate, 3.0)).unwrap();
            let features = extraction.features;
            println!("{}Hz features: {:?}", rate, features);

            assert_eq!(extraction.spectrogram.sample_rate, ANALYSIS_SAMPLE_RATE);
            assert_eq!(
                extraction.spectrogram.frame_count(),
                reference.spectrogram.frame_count()
            );
            assert!(
                (features.high_freq_ratio - reference.features.high_freq_ratio).abs() < 0.02,
                "{}Hz: {:?}",
                rate,
                features
            );
            assert!(features.rms_variance < 1e-4, "{}Hz: {:?}", rate, features);
            assert_eq!(features.impulse_density, 0.0, "{}Hz", rate);
        }
    }

    #[test]
    fn test_steady_tones_have_no_onsets_at_any_rate() {
        let extractor = FeatureExtractor::default();
        for rate in [22050, 44100, 48000] {
            for freq in [100.0, 220.0, 440.0, 1000.0, 3000.0] {
                let extraction = extractor.extract(&tone(freq, rate, 3.0)).unwrap();
                assert!(
                    extraction.onset_frames.is_empty(),
                    "{}Hz tone at {}Hz: {:?}",
                    freq,
                    rate,
                    extraction.onset_frames
                );
                assert_eq!(extraction.features.impulse_density, 0.0);
            }
        }
    }

    #[test]
    fn test_prepare_resamples_and_normalizes() {
        let extractor = FeatureExtractor::default();
        let mut quiet = tone(440.0, 44100, 1.0);
        for sample in &mut quiet.samples {
            *sample *= 0.1;
        }

        let prepared = extractor.prepare(quiet).unwrap();
        assert_eq!(prepared.sample_rate, ANALYSIS_SAMPLE_RATE);
        assert_eq!(prepared.samples.len(), 22050);
        assert!((prepared.peak() - 1.0).abs() < 1e-6);

        assert!(matches!(
            extractor.prepare(Waveform::new(Vec::new(), 44100)),
            Err(DiagnosticError::InvalidSignal(_))
        ));
    }

    #[test]
    fn test_clicks_raise_impulse_density_and_variance() {
        let sample_rate = 22050;
        let mut samples = vec![0.0f32; sample_rate as usize * 2];
        // Eight short broadband clicks, 250 ms apart
        for n in 0..8 {
            let start = 2000 + n * (sample_rate as usize / 4);
            for (i, sample) in samples[start..start + 200].iter_mut().enumerate() {
                *sample = if i % 2 == 0 { 1.0 } else { -1.0 };
            }
        }

        let extraction = FeatureExtractor::default()
            .extract(&Waveform::new(samples, sample_rate))
            .unwrap();

        assert!(extraction.onset_frames.len() >= 6, "{:?}", extraction.onset_frames);
        assert!(extraction.features.impulse_density >= 3.0);
        assert!(extraction.features.rms_variance > 0.0003);
    }

    #[test]
    fn test_spectrogram_dimensions() {
        let extraction = FeatureExtractor::default()
            .extract(&tone(440.0, 22050, 1.0))
            .unwrap();
        assert_eq!(extraction.spectrogram.n_mels(), 128);
        assert_eq!(extraction.spectrogram.frame_count(), 40);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let waveform = tone(1234.0, 16000, 1.5);
        let a = extractor.extract(&waveform).unwrap();
        let b = extractor.extract(&waveform).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.spectrogram, b.spectrogram);
    }
}
