//! Persistent analysis history

mod store;

pub use store::AnalysisHistoryStore;
