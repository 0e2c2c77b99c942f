//! Data layer of the box-office analyzer.
//!
//! Discovers and normalizes raw ticket-sales exports, merges them into one
//! dataset, resolves venues against the registry and aggregates everything
//! into the report the renderers consume.

pub mod aggregator;
pub mod analysis;
pub mod merger;
pub mod reader;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyzer_core as core;
