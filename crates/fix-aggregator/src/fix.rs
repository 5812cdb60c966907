//! Consolidated Fix State

use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Instant;

/// A field value paired with the instant it was last updated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observed<T> {
    pub value: T,
    pub updated_at: Instant,
}

impl<T> Observed<T> {
    fn new(value: T, updated_at: Instant) -> Self {
        Self { value, updated_at }
    }

    /// Age of this observation in milliseconds at `now`
    pub fn age_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.updated_at).as_millis() as u64
    }
}

/// The running fix state, one slot per CSV column
///
/// Every slot is either observed (value plus last-update instant) or never
/// observed. The MAC address is injected at construction and never expires.
/// Only the aggregator mutates this; the writer only ever sees snapshots.
#[derive(Debug, Clone)]
pub struct ConsolidatedFix {
    mac_address: String,
    pub(crate) datetime: Option<Observed<NaiveDateTime>>,
    pub(crate) satellites: Option<Observed<u32>>,
    pub(crate) hdop: Option<Observed<f64>>,
    pub(crate) latitude: Option<Observed<f64>>,
    pub(crate) longitude: Option<Observed<f64>>,
    pub(crate) altitude_m: Option<Observed<f64>>,
    pub(crate) speed_kmh: Option<Observed<f64>>,
    pub(crate) course_deg: Option<Observed<f64>>,
}

impl ConsolidatedFix {
    /// Create an empty fix for the given device identity
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            datetime: None,
            satellites: None,
            hdop: None,
            latitude: None,
            longitude: None,
            altitude_m: None,
            speed_kmh: None,
            course_deg: None,
        }
    }

    /// Device identity injected at startup
    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    pub(crate) fn observe<T>(slot: &mut Option<Observed<T>>, value: Option<T>, now: Instant) {
        if let Some(value) = value {
            *slot = Some(Observed::new(value, now));
        }
    }

    /// Take an immutable snapshot with ages resolved at `now`
    pub fn snapshot(&self, now: Instant) -> FixSnapshot {
        fn capture<T: Copy>(slot: &Option<Observed<T>>, now: Instant) -> Option<SnapshotField<T>> {
            slot.as_ref().map(|obs| SnapshotField {
                value: obs.value,
                age_ms: obs.age_ms(now),
            })
        }

        FixSnapshot {
            mac_address: self.mac_address.clone(),
            datetime: capture(&self.datetime, now),
            satellites: capture(&self.satellites, now),
            hdop: capture(&self.hdop, now),
            latitude: capture(&self.latitude, now),
            longitude: capture(&self.longitude, now),
            altitude_m: capture(&self.altitude_m, now),
            speed_kmh: capture(&self.speed_kmh, now),
            course_deg: capture(&self.course_deg, now),
        }
    }
}

/// A snapshot field: the observed value and its age at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotField<T> {
    pub value: T,
    pub age_ms: u64,
}

/// Immutable copy of the consolidated fix handed to the CSV writer
///
/// Fields that were never observed are `None`; the writer emits those with
/// an explicit unknown sentinel, never a default value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixSnapshot {
    pub mac_address: String,
    pub datetime: Option<SnapshotField<NaiveDateTime>>,
    pub satellites: Option<SnapshotField<u32>>,
    pub hdop: Option<SnapshotField<f64>>,
    pub latitude: Option<SnapshotField<f64>>,
    pub longitude: Option<SnapshotField<f64>>,
    pub altitude_m: Option<SnapshotField<f64>>,
    pub speed_kmh: Option<SnapshotField<f64>>,
    pub course_deg: Option<SnapshotField<f64>>,
}

impl FixSnapshot {
    /// Age of the position for the `dataAge` CSV column
    pub fn position_age_ms(&self) -> Option<u64> {
        self.latitude.as_ref().map(|field| field.age_ms)
    }
}
