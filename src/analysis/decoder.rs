//! Audio decoding with symphonia
//!
//! Decodes any container/codec symphonia supports into mono f32 samples.
//! Multi-channel audio is down-mixed by averaging channels.

use super::traits::{Waveform, WaveformLoader};
use crate::error::{DiagnosticError, Result};
use anyhow::{bail, Context};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Waveform loader backed by symphonia
#[derive(Debug, Clone, Default)]
pub struct SymphoniaLoader {
    /// Stop decoding after this many seconds (None = whole file)
    max_duration_secs: Option<f32>,
}

impl SymphoniaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only decode the first `secs` seconds of each source
    pub fn with_max_duration(mut self, secs: f32) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }
}

impl WaveformLoader for SymphoniaLoader {
    fn load(&self, source: &Path) -> Result<Waveform> {
        let (samples, sample_rate) =
            decode_to_mono(source, self.max_duration_secs).map_err(|e| {
                DiagnosticError::DecodeFailure {
                    path: source.to_path_buf(),
                    reason: format!("{:#}", e),
                }
            })?;

        log::debug!(
            "{:?}: {} mono samples at {}Hz ({:.2}s)",
            source,
            samples.len(),
            sample_rate,
            samples.len() as f64 / sample_rate as f64
        );

        Ok(Waveform::new(samples, sample_rate))
    }
}

/// Decode the first audio track of `path`, down-mixed to mono
fn decode_to_mono(path: &Path, max_duration_secs: Option<f32>) -> anyhow::Result<(Vec<f32>, u32)> {
    let mut reader = TrackReader::open(path)?;
    let limit = max_duration_secs
        .map(|secs| (secs.max(0.0) as f64 * reader.sample_rate as f64) as usize);

    let mut samples = Vec::new();
    while reader.read_into(&mut samples)? {
        if let Some(limit) = limit {
            if samples.len() >= limit {
                samples.truncate(limit);
                break;
            }
        }
    }

    Ok((samples, reader.sample_rate))
}

/// Container reader and codec for one audio track
struct TrackReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    /// Interleaved scratch buffer, reused while packets fit
    buffer: Option<SampleBuffer<f32>>,
    buffer_len: usize,
}

impl TrackReader {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Unrecognized audio container: {:?}", path))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found")?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .context("Audio track does not declare a sample rate")?;
        if sample_rate == 0 {
            bail!("Audio track declares a sample rate of zero");
        }

        let track_id = track.id;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Unsupported audio codec")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            buffer: None,
            buffer_len: 0,
        })
    }

    /// Decode the next packet of the track and append it to `out` as mono
    ///
    /// Returns `false` once the stream is exhausted.
    fn read_into(&mut self, out: &mut Vec<f32>) -> anyhow::Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    log::warn!("Stopping at unreadable packet: {}", e);
                    return Ok(false);
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e).context("Audio decoder failed"),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needed = decoded.capacity() * channels;
            if self.buffer.is_none() || needed > self.buffer_len {
                self.buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                self.buffer_len = needed;
            }

            let Some(buffer) = self.buffer.as_mut() else {
                continue;
            };
            buffer.copy_interleaved_ref(decoded);
            mix_down(buffer.samples(), channels, out);

            return Ok(true);
        }
    }
}

/// Average interleaved frames into single samples
fn mix_down(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_decode_failure() {
        let result = SymphoniaLoader::new().load(Path::new("/nonexistent/engine.wav"));
        match result {
            Err(DiagnosticError::DecodeFailure { path, reason }) => {
                assert_eq!(path, Path::new("/nonexistent/engine.wav"));
                assert!(reason.contains("Failed to open audio file"));
            }
            other => panic!("expected DecodeFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_mix_down_averages_channels() {
        let mut out = vec![9.0];
        mix_down(&[0.5, -0.5, 1.0, 0.0, 0.25, 0.75], 2, &mut out);
        assert_eq!(out, vec![9.0, 0.0, 0.5, 0.5]);

        let mut mono = Vec::new();
        mix_down(&[0.1, 0.2], 1, &mut mono);
        assert_eq!(mono, vec![0.1, 0.2]);
    }

    #[test]
    fn test_garbage_file_is_decode_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let result = SymphoniaLoader::new().load(&path);
        assert!(matches!(result, Err(DiagnosticError::DecodeFailure { .. })));
    }
}
