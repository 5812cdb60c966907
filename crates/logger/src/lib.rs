//! GNSS CSV Data Logger
//!
//! Wires the pipeline together: UART bytes land in the ring buffer, the
//! logger loop frames and decodes them into fix updates, the aggregator
//! consolidates, and completed fixes are appended to the CSV log.

mod config;
mod pipeline;
mod serial;

pub use config::LoggerConfig;
pub use pipeline::{LoggerLoop, PipelineCounters};
pub use serial::read_serial;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
