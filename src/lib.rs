//! Engine Ear - acoustic engine health diagnostics
//!
//! This library classifies the mechanical health of an engine from a
//! recorded audio sample and keeps a durable history of past analyses.

pub mod analysis;
pub mod diagnostic;
pub mod error;
pub mod history;
pub mod model;

pub use diagnostic::{Diagnosis, DiagnosticConfig, DiagnosticService};
pub use error::{DiagnosticError, Result};
