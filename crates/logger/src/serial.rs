//! Serial Producer Task
//!
//! Reads raw bytes from the GNSS UART and pushes them into the ring buffer.
//! `push` never blocks, so this task keeps pace with the receiver even when
//! the logger loop falls behind; overrun bytes age out of the ring.

use anyhow::Context;
use ring_buffer::ByteRing;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

/// Read from the serial device forever, feeding the ring buffer
pub async fn read_serial(ring: Arc<ByteRing>, device: &str, baud_rate: u32) -> anyhow::Result<()> {
    let mut port = tokio_serial::new(device, baud_rate)
        .open_native_async()
        .with_context(|| format!("failed to open serial device {}", device))?;

    info!(device, baud_rate, "serial producer started");

    let mut buf = [0u8; 256];
    loop {
        let n = port
            .read(&mut buf)
            .await
            .with_context(|| format!("read error on serial device {}", device))?;
        if n == 0 {
            anyhow::bail!("serial device {} reached EOF", device);
        }
        for &byte in &buf[..n] {
            ring.push(byte);
        }
    }
}
