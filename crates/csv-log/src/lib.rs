//! CSV Log Storage
//!
//! Appends consolidated fixes to the log file, one row per emission, with
//! the fixed column header written exactly once at file creation. Every row
//! is flushed and synced before the write returns; a logger is only worth
//! its data.

mod writer;

pub use writer::{CsvLogWriter, CSV_COLUMNS, UNKNOWN_FIELD};

use fix_aggregator::FixSnapshot;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum WriteError {
    /// Log file could not be opened or initialized; fatal at startup
    #[error("Failed to initialize log file {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Row could not be serialized
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// Row could not be appended or synced; the row is lost
    #[error("I/O error writing log row: {0}")]
    Io(#[from] io::Error),
}

/// Destination for consolidated fix rows
///
/// The logger loop writes through this seam, so storage faults can be
/// injected in tests without a failing filesystem.
pub trait FixSink {
    /// Append one row for the snapshot
    fn write(&mut self, snapshot: &FixSnapshot) -> Result<(), WriteError>;
}
