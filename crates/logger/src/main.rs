//! GNSS CSV Data Logger - Main Entry Point

use anyhow::Context;
use csv_log::CsvLogWriter;
use fix_aggregator::{AggregatorConfig, FixAggregator};
use logger::{init_logging, read_serial, LoggerConfig, LoggerLoop};
use ring_buffer::ByteRing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== GNSS CSV Logger v{} ===", env!("CARGO_PKG_VERSION"));

    let config = LoggerConfig::default();
    info!(
        device = %config.serial_device,
        baud = config.baud_rate,
        log = %config.log_file_path.display(),
        "starting logger"
    );

    // Storage init is the one fatal failure: a log that cannot start must
    // halt the pipeline before any row is produced.
    let writer = CsvLogWriter::open(&config.log_file_path)
        .context("storage initialization failed")?;

    let ring = Arc::new(ByteRing::new(config.ring_capacity));
    let aggregator = FixAggregator::new(config.mac_address.clone(), AggregatorConfig::default());

    let producer_ring = Arc::clone(&ring);
    let device = config.serial_device.clone();
    let baud_rate = config.baud_rate;
    tokio::spawn(async move {
        if let Err(e) = read_serial(producer_ring, &device, baud_rate).await {
            error!("serial producer stopped: {:#}", e);
        }
    });

    LoggerLoop::new(ring, aggregator, writer)
        .run(Duration::from_millis(config.poll_interval_ms))
        .await;

    Ok(())
}
