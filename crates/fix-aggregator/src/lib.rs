//! Fix Aggregation
//!
//! Fuses partial updates from different sentence kinds into one running
//! "current fix", tracking how fresh each field is, and decides when the
//! consolidated fix is ready to be written out.

mod aggregator;
mod fix;

pub use aggregator::{AggregatorConfig, FixAggregator};
pub use fix::{ConsolidatedFix, FixSnapshot, Observed, SnapshotField};
