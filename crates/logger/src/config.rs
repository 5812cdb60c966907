//! Logger configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logger configuration
///
/// On the target device these are fixed at build time; the defaults carry
/// the deployed values. The MAC address is supplied by the host environment
/// and stamped into every emitted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Serial device the GNSS receiver is attached to
    pub serial_device: String,

    /// GNSS receiver baud rate
    pub baud_rate: u32,

    /// Path of the CSV log file
    pub log_file_path: PathBuf,

    /// Device identity written into the macAddress column
    pub mac_address: String,

    /// Capacity of the raw byte ring buffer
    pub ring_capacity: usize,

    /// Cadence of the logger loop in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            serial_device: "/dev/ttyUSB0".to_string(),
            baud_rate: 38400,
            log_file_path: PathBuf::from("/log.csv"),
            mac_address: "00:00:00:00:00:00".to_string(),
            ring_capacity: ring_buffer::DEFAULT_CAPACITY,
            poll_interval_ms: 50,
        }
    }
}
