//! CSV Log Writer Implementation

use crate::WriteError;
use fix_aggregator::{FixSnapshot, SnapshotField};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The fixed column header, written once at file creation
pub const CSV_COLUMNS: [&str; 10] = [
    "macAddress",
    "datetime",
    "satellites",
    "hdop",
    "latitude",
    "longitude",
    "alt",
    "speed",
    "direction",
    "dataAge",
];

/// Sentinel emitted for a field that was never observed
pub const UNKNOWN_FIELD: &str = "*";

/// Append-only, sync-on-write CSV log writer
pub struct CsvLogWriter {
    file: File,
    path: PathBuf,
    rows_written: u64,
}

impl CsvLogWriter {
    /// Open (or create) the log file, writing the header if the file is new
    ///
    /// This is the one fatal failure point of the pipeline: a log that cannot
    /// be initialized must stop the logger before any row is produced.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref().to_path_buf();
        let init_err = |source| WriteError::Init {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(init_err)?;
        let is_new = file.metadata().map_err(init_err)?.len() == 0;

        if is_new {
            let header = encode_record(CSV_COLUMNS.iter().copied())?;
            file.write_all(&header).map_err(init_err)?;
            file.sync_data().map_err(init_err)?;
            info!(path = %path.display(), "created log file with header");
        } else {
            info!(path = %path.display(), "appending to existing log file");
        }

        Ok(Self {
            file,
            path,
            rows_written: 0,
        })
    }

    /// Append one row for the snapshot, flushing and syncing before returning
    pub fn write(&mut self, snapshot: &FixSnapshot) -> Result<(), WriteError> {
        let row = format_row(snapshot);
        let bytes = encode_record(row.iter().map(String::as_str))?;

        self.file.write_all(&bytes)?;
        self.file.sync_data()?;

        self.rows_written += 1;
        debug!(path = %self.path.display(), rows = self.rows_written, "appended log row");
        Ok(())
    }

    /// Rows written by this writer since it was opened
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl crate::FixSink for CsvLogWriter {
    fn write(&mut self, snapshot: &FixSnapshot) -> Result<(), WriteError> {
        CsvLogWriter::write(self, snapshot)
    }
}

/// Encode one record through the csv crate into a newline-terminated line
fn encode_record<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| WriteError::Io(e.into_error()))
}

/// Format the 10 columns in header order
fn format_row(snapshot: &FixSnapshot) -> [String; 10] {
    [
        snapshot.mac_address.clone(),
        field(&snapshot.datetime, |dt| {
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        }),
        field(&snapshot.satellites, |n| n.to_string()),
        field(&snapshot.hdop, |v| format!("{:.2}", v)),
        field(&snapshot.latitude, |v| format!("{:.6}", v)),
        field(&snapshot.longitude, |v| format!("{:.6}", v)),
        field(&snapshot.altitude_m, |v| format!("{:.2}", v)),
        field(&snapshot.speed_kmh, |v| format!("{:.2}", v)),
        field(&snapshot.course_deg, |v| format!("{:.2}", v)),
        snapshot
            .position_age_ms()
            .map(|age| age.to_string())
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
    ]
}

fn field<T: Copy>(slot: &Option<SnapshotField<T>>, render: impl Fn(T) -> String) -> String {
    slot.as_ref()
        .map(|f| render(f.value))
        .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
}
