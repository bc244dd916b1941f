//! Branch-metadata collection engine.
//!
//! Walks every branch of every repository under a clone directory,
//! computes per-branch ownership statistics and file/term predicates, and
//! aggregates the results into one sorted dataset for the report layer.

pub mod analyzer;
pub mod collector;
pub mod config;
pub mod error;
pub mod predicates;
pub mod records;

pub use collector::Collector;
pub use config::{ScanConfig, DEFAULT_EXCLUDED_AUTHOR};
pub use error::CollectError;
pub use records::{AggregateResult, BranchRecord};
