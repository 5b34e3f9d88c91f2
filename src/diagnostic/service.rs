//! Diagnostic pipeline orchestration

use super::config::DiagnosticConfig;
use crate::analysis::{
    classify, thresholds, FeatureExtractor, MelSpectrogram, Waveform, WaveformLoader,
};
use crate::error::Result;
use crate::history::AnalysisHistoryStore;
use crate::model::{AnalysisRecord, EngineType};
use chrono::Local;
use std::path::Path;

/// Outcome of one analysis
#[derive(Debug, Clone)]
pub struct Diagnosis {
    /// The record appended to history
    pub record: AnalysisRecord,

    /// Log-power mel spectrogram of the normalized waveform, for visualizers
    pub spectrogram: MelSpectrogram,
}

/// Main diagnostic service
///
/// Runs load -> resample -> normalize -> extract -> classify -> persist
/// synchronously.
pub struct DiagnosticService<L: WaveformLoader> {
    config: DiagnosticConfig,
    loader: L,
    extractor: FeatureExtractor,
    history: AnalysisHistoryStore,
}

impl<L: WaveformLoader> DiagnosticService<L> {
    /// Create a service, loading any existing history
    pub fn new(config: DiagnosticConfig, loader: L) -> Result<Self> {
        let history = AnalysisHistoryStore::open(config.history_path.clone())?;
        let extractor = FeatureExtractor::new(config.extractor.clone());

        log::info!(
            "History loaded: {} entries from {:?}",
            history.len(),
            history.path()
        );

        Ok(Self {
            config,
            loader,
            extractor,
            history,
        })
    }

    /// Analyze an audio file
    pub fn run_analysis(&mut self, source: &Path, engine_type: EngineType) -> Result<Diagnosis> {
        log::info!("Analyzing {:?} as {}", source, engine_type);

        let waveform = self.loader.load(source)?;

        let source_name = source
            .file_name()
            .unwrap_or_else(|| source.as_os_str())
            .to_string_lossy()
            .into_owned();

        self.analyze_waveform(&source_name, waveform, engine_type)
    }

    /// Analyze an already-decoded waveform
    ///
    /// The waveform is resampled to the analysis rate and peak-normalized
    /// first. If the history append fails, the error carries the computed
    /// record and spectrogram.
    pub fn analyze_waveform(
        &mut self,
        source_name: &str,
        waveform: Waveform,
        engine_type: EngineType,
    ) -> Result<Diagnosis> {
        let waveform = self.extractor.prepare(waveform)?;
        let extraction = self.extractor.extract(&waveform)?;
        let profile = thresholds::lookup(&engine_type);
        let classification = classify(&extraction.features, &profile);

        let record = AnalysisRecord {
            timestamp: Local::now(),
            source_name: source_name.to_string(),
            engine_type,
            status: classification.status,
            risk_score: classification.risk_score,
            features: extraction.features,
            advice: classification.advice.to_string(),
        };

        log::info!(
            "{}: {} (risk {})",
            record.source_name,
            record.status,
            record.risk_score
        );

        if let Err(e) = self.history.append(record.clone()) {
            return Err(e.with_spectrogram(extraction.spectrogram));
        }

        Ok(Diagnosis {
            record,
            spectrogram: extraction.spectrogram,
        })
    }

    /// Read access to the analysis history
    pub fn history(&self) -> &AnalysisHistoryStore {
        &self.history
    }

    /// The configured number of recent entries, most recent first
    pub fn recent(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.history.recent(self.config.recent_limit)
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }
}
