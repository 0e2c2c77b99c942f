//! Shared building blocks for the box-office analyzer.
//!
//! Domain models and the venue registry, the error type, CLI settings,
//! number and date formatting, and the collaborator interfaces (office suite,
//! progress reporting) used by the data, report and runtime crates.

pub mod cancel;
pub mod error;
pub mod formatting;
pub mod models;
pub mod office;
pub mod progress;
pub mod registry;
pub mod settings;
pub mod time_utils;

pub use cancel::CancelFlag;
pub use error::{AnalyzerError, Result};
