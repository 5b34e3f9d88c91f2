//! Diagnostic error types

use crate::analysis::MelSpectrogram;
use crate::diagnostic::Diagnosis;
use crate::model::AnalysisRecord;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for diagnostic operations
pub type Result<T> = std::result::Result<T, DiagnosticError>;

/// Errors that can occur while analyzing a sample or maintaining history
#[derive(Error, Debug)]
pub enum DiagnosticError {
    /// Empty signal, zero sample rate or non-finite samples
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// The waveform loader could not produce samples
    #[error("Failed to decode audio source {path:?}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    /// History storage could not be read or an append could not be durably committed.
    ///
    /// For a failed append, `record` holds the analysis that was not saved,
    /// and `spectrogram` the mel spectrogram computed with it when the
    /// failure came out of a full diagnosis.
    #[error("Failed to persist analysis history at {path:?}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
        record: Option<Box<AnalysisRecord>>,
        spectrogram: Option<Box<MelSpectrogram>>,
    },

    /// The persisted history exists but cannot be parsed
    #[error("Analysis history at {path:?} is corrupt: {source}")]
    CorruptHistory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DiagnosticError {
    /// The computed record attached to a persistence failure, if any
    pub fn unsaved_record(&self) -> Option<&AnalysisRecord> {
        match self {
            DiagnosticError::PersistenceFailure { record, .. } => record.as_deref(),
            _ => None,
        }
    }

    /// The spectrogram computed alongside an unsaved record, if any
    pub fn unsaved_spectrogram(&self) -> Option<&MelSpectrogram> {
        match self {
            DiagnosticError::PersistenceFailure { spectrogram, .. } => spectrogram.as_deref(),
            _ => None,
        }
    }

    /// Take back the full diagnosis that could not be saved
    pub fn into_unsaved(self) -> Option<Diagnosis> {
        match self {
            DiagnosticError::PersistenceFailure {
                record: Some(record),
                spectrogram: Some(spectrogram),
                ..
            } => Some(Diagnosis {
                record: *record,
                spectrogram: *spectrogram,
            }),
            _ => None,
        }
    }

    /// Attach the spectrogram of the unsaved record to a persistence failure
    pub(crate) fn with_spectrogram(self, unsaved: MelSpectrogram) -> Self {
        match self {
            DiagnosticError::PersistenceFailure {
                path,
                source,
                record,
                ..
            } => DiagnosticError::PersistenceFailure {
                path,
                source,
                record,
                spectrogram: Some(Box::new(unsaved)),
            },
            other => other,
        }
    }
}
