//! Diagnostic configuration

use crate::analysis::ExtractorConfig;
use std::path::PathBuf;

/// Default location of the history file (relative to the working directory)
pub const DEFAULT_HISTORY_FILE: &str = "history.json";

/// Configuration for the diagnostic service
#[derive(Debug, Clone)]
pub struct DiagnosticConfig {
    /// Where the analysis history is persisted
    pub history_path: PathBuf,

    /// Frame, FFT and band parameters for feature extraction
    pub extractor: ExtractorConfig,

    /// Number of history entries front ends show by default
    pub recent_limit: usize,
}

impl DiagnosticConfig {
    /// Create a configuration persisting history at `history_path`
    pub fn new(history_path: PathBuf) -> Self {
        Self {
            history_path,
            extractor: ExtractorConfig::default(),
            recent_limit: 10,
        }
    }

    /// Override the feature extraction parameters
    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set how many history entries front ends show
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_HISTORY_FILE))
    }
}
