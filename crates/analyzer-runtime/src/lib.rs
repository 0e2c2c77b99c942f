//! Runtime layer of the box-office analyzer.
//!
//! Owns the workspace where raw exports accumulate, drives the batch state
//! machine and runs analyses in the background, one at a time.

pub mod batch;
pub mod runner;
pub mod workspace;

pub use analyzer_core as core;
pub use analyzer_data as data;
pub use analyzer_report as report;
