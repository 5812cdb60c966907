//! Logger Loop Implementation

use csv_log::{CsvLogWriter, FixSink};
use fix_aggregator::FixAggregator;
use nmea_protocol::{decode, DecodeError, Framer};
use ring_buffer::ByteRing;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Monotone error and progress counters for the whole pipeline
///
/// The ring buffer reports its overflow count itself; everything downstream
/// of the drain surfaces here, framing drops included.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineCounters {
    /// Frames dropped for a byte violating the expected class
    pub malformed_frames: u64,
    /// Frames dropped for exceeding the payload length bound
    pub oversize_frames: u64,
    /// Sentences dropped for a bad checksum
    pub checksum_mismatches: u64,
    /// Sentences of a kind outside the supported set
    pub unsupported_kinds: u64,
    /// Sentences with a bad field count or unparsable field
    pub field_parse_errors: u64,
    /// Rows lost to storage write failures
    pub write_errors: u64,
    /// Rows successfully appended to the log
    pub rows_emitted: u64,
}

/// Drives one-directional flow: ring → framer → decoder → aggregator → writer
///
/// Every component error is absorbed and counted here; nothing recoverable
/// stops the loop. The only fatal failure is storage initialization, which
/// happens before the loop is constructed.
pub struct LoggerLoop<S = CsvLogWriter> {
    ring: Arc<ByteRing>,
    framer: Framer,
    aggregator: FixAggregator,
    writer: S,
    counters: PipelineCounters,
}

impl<S: FixSink> LoggerLoop<S> {
    /// Assemble the loop from its already-initialized components
    pub fn new(ring: Arc<ByteRing>, aggregator: FixAggregator, writer: S) -> Self {
        Self {
            ring,
            framer: Framer::new(),
            aggregator,
            writer,
            counters: PipelineCounters::default(),
        }
    }

    /// Run one iteration: drain, frame, decode, merge, maybe emit
    ///
    /// Returns the number of rows written this iteration (0 or 1 under the
    /// epoch trigger).
    pub fn iterate(&mut self, now: Instant) -> usize {
        let mut rows = 0;

        for byte in self.ring.drain() {
            let Some(sentence) = self.framer.push_byte(byte) else {
                continue;
            };
            match decode(&sentence) {
                Ok(update) => self.aggregator.merge(update, now),
                Err(e) => {
                    match e {
                        DecodeError::ChecksumMismatch { .. } => {
                            self.counters.checksum_mismatches += 1
                        }
                        DecodeError::UnsupportedKind(_) => self.counters.unsupported_kinds += 1,
                        DecodeError::FieldParse { .. } => self.counters.field_parse_errors += 1,
                    }
                    debug!("dropped sentence: {}", e);
                }
            }
        }

        if self.aggregator.is_ready_to_emit(now) {
            let snapshot = self.aggregator.snapshot(now);
            // The epoch is consumed either way; a failed write loses the row.
            self.aggregator.mark_emitted(now);
            match self.writer.write(&snapshot) {
                Ok(()) => {
                    self.counters.rows_emitted += 1;
                    rows = 1;
                    debug!(rows = self.counters.rows_emitted, "fix row appended");
                }
                Err(e) => {
                    self.counters.write_errors += 1;
                    warn!("log row dropped: {}", e);
                }
            }
        }

        rows
    }

    /// Run for device lifetime at the configured cadence
    pub async fn run(mut self, poll_interval: Duration) {
        info!(
            interval_ms = poll_interval.as_millis() as u64,
            "logger loop started"
        );
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            self.iterate(Instant::now());
        }
    }

    /// Current pipeline counters, framing drops included
    pub fn counters(&self) -> PipelineCounters {
        PipelineCounters {
            malformed_frames: self.framer.malformed_count(),
            oversize_frames: self.framer.oversize_count(),
            ..self.counters
        }
    }

    /// The aggregator driven by this loop
    pub fn aggregator(&self) -> &FixAggregator {
        &self.aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_aggregator::AggregatorConfig;
    use tempfile::tempdir;

    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const RMC: &[u8] =
        b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";
    const GSV: &[u8] =
        b"$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74\r\n";

    fn build_loop(path: &std::path::Path) -> LoggerLoop {
        let ring = Arc::new(ByteRing::new(1024));
        let aggregator =
            FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let writer = CsvLogWriter::open(path).unwrap();
        LoggerLoop::new(ring, aggregator, writer)
    }

    fn push_all(ring: &ByteRing, bytes: &[u8]) {
        for &b in bytes {
            ring.push(b);
        }
    }

    #[test]
    fn test_end_to_end_single_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);

        push_all(&pipeline.ring, GGA);
        push_all(&pipeline.ring, RMC);
        let rows = pipeline.iterate(Instant::now());
        assert_eq!(rows, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "macAddress,datetime,satellites,hdop,latitude,longitude,alt,speed,direction,dataAge"
        );

        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0], "AA:BB:CC:DD:EE:FF");
        assert_eq!(fields[1], "1994-03-23 12:35:19");
        assert_eq!(fields[2], "8");
        assert_eq!(fields[3], "0.90");
        assert!(fields[4].starts_with("48.117"));
        assert!(fields[5].starts_with("11.516"));
        assert_eq!(fields[6], "545.40");
    }

    #[test]
    fn test_incomplete_epoch_emits_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);

        push_all(&pipeline.ring, GGA);
        assert_eq!(pipeline.iterate(Instant::now()), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1); // header only
    }

    #[test]
    fn test_sentence_split_across_iterations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);

        let (head, tail) = GGA.split_at(20);
        push_all(&pipeline.ring, head);
        let t0 = Instant::now();
        assert_eq!(pipeline.iterate(t0), 0);

        push_all(&pipeline.ring, tail);
        push_all(&pipeline.ring, RMC);
        let rows = pipeline.iterate(t0 + Duration::from_millis(50));
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_decode_errors_are_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);

        // Corrupted checksum digit, then an unsupported kind, then a good epoch
        push_all(&pipeline.ring, b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n");
        push_all(&pipeline.ring, GSV);
        push_all(&pipeline.ring, GGA);
        push_all(&pipeline.ring, RMC);

        let rows = pipeline.iterate(Instant::now());
        assert_eq!(rows, 1);
        assert_eq!(pipeline.counters().checksum_mismatches, 1);
        assert_eq!(pipeline.counters().unsupported_kinds, 1);
        assert_eq!(pipeline.counters().rows_emitted, 1);
    }

    #[test]
    fn test_framing_drops_surface_in_counters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);

        // A frame truncated by the next start delimiter, then an oversize one
        push_all(&pipeline.ring, b"$GPGGA,12");
        push_all(&pipeline.ring, GGA);
        push_all(&pipeline.ring, b"$");
        for _ in 0..nmea_protocol::MAX_PAYLOAD_LEN + 10 {
            pipeline.ring.push(b'9');
        }

        pipeline.iterate(Instant::now());
        assert_eq!(pipeline.counters().malformed_frames, 1);
        assert_eq!(pipeline.counters().oversize_frames, 1);
    }

    struct FlakySink {
        inner: CsvLogWriter,
        fail_remaining: u32,
    }

    impl FixSink for FlakySink {
        fn write(
            &mut self,
            snapshot: &fix_aggregator::FixSnapshot,
        ) -> Result<(), csv_log::WriteError> {
            if self.fail_remaining > 0 {
                self.fail_remaining -= 1;
                return Err(csv_log::WriteError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "storage fault",
                )));
            }
            self.inner.write(snapshot)
        }
    }

    #[test]
    fn test_write_failure_drops_row_and_loop_continues() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let ring = Arc::new(ByteRing::new(1024));
        let aggregator =
            FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let sink = FlakySink {
            inner: CsvLogWriter::open(&path).unwrap(),
            fail_remaining: 1,
        };
        let mut pipeline = LoggerLoop::new(ring, aggregator, sink);
        let t0 = Instant::now();

        push_all(&pipeline.ring, GGA);
        push_all(&pipeline.ring, RMC);
        assert_eq!(pipeline.iterate(t0), 0);
        assert_eq!(pipeline.counters().write_errors, 1);
        assert_eq!(pipeline.counters().rows_emitted, 0);

        // The failed epoch's row is lost; the next one still lands
        push_all(&pipeline.ring, GGA);
        push_all(&pipeline.ring, RMC);
        assert_eq!(pipeline.iterate(t0 + Duration::from_millis(100)), 1);
        assert_eq!(pipeline.counters().write_errors, 1);
        assert_eq!(pipeline.counters().rows_emitted, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2); // header + one successful row
    }

    #[test]
    fn test_successive_epochs_append_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut pipeline = build_loop(&path);
        let t0 = Instant::now();

        for i in 0..3u64 {
            push_all(&pipeline.ring, GGA);
            push_all(&pipeline.ring, RMC);
            assert_eq!(pipeline.iterate(t0 + Duration::from_millis(100 * (i + 1))), 1);
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4); // header + 3 rows
        assert_eq!(pipeline.counters().rows_emitted, 3);
    }
}
