//! Diagnostic orchestration

pub mod config;
pub mod service;

pub use config::DiagnosticConfig;
pub use service::{Diagnosis, DiagnosticService};
