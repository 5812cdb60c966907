//! Fix Aggregator Implementation

use crate::fix::{ConsolidatedFix, FixSnapshot};
use nmea_protocol::{FixUpdate, SentenceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

/// Configuration for the fix aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Sentence kinds that make up one emission epoch
    ///
    /// The fix is ready to emit once every kind in this set has been merged
    /// since the last emission.
    pub epoch_kinds: Vec<SentenceKind>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            // GGA carries satellites/HDOP/altitude, RMC carries date, speed
            // and course; together they populate every CSV column.
            epoch_kinds: vec![SentenceKind::Gga, SentenceKind::Rmc],
        }
    }
}

/// Merges decoded fix updates into the consolidated fix
///
/// Emission is epoch-based: one row per complete round of the configured
/// sentence kinds. Emission instants are strictly increasing because the
/// epoch set only refills after `mark_emitted` and readiness requires a
/// later instant than the last emission.
pub struct FixAggregator {
    fix: ConsolidatedFix,
    config: AggregatorConfig,
    seen_since_emit: HashSet<SentenceKind>,
    last_emitted: Option<Instant>,
}

impl FixAggregator {
    /// Create an aggregator for the given device identity
    pub fn new(mac_address: impl Into<String>, config: AggregatorConfig) -> Self {
        Self {
            fix: ConsolidatedFix::new(mac_address),
            config,
            seen_since_emit: HashSet::new(),
            last_emitted: None,
        }
    }

    /// Merge one update: supplied fields overwrite and restamp, absent
    /// fields keep their previous value and age
    pub fn merge(&mut self, update: FixUpdate, now: Instant) {
        let kind = update.kind();
        match update {
            FixUpdate::Gga(gga) => {
                ConsolidatedFix::observe(&mut self.fix.satellites, gga.satellites, now);
                ConsolidatedFix::observe(&mut self.fix.hdop, gga.hdop, now);
                ConsolidatedFix::observe(&mut self.fix.latitude, gga.latitude, now);
                ConsolidatedFix::observe(&mut self.fix.longitude, gga.longitude, now);
                ConsolidatedFix::observe(&mut self.fix.altitude_m, gga.altitude_m, now);
            }
            FixUpdate::Rmc(rmc) => {
                ConsolidatedFix::observe(&mut self.fix.datetime, rmc.datetime, now);
                ConsolidatedFix::observe(&mut self.fix.latitude, rmc.latitude, now);
                ConsolidatedFix::observe(&mut self.fix.longitude, rmc.longitude, now);
                ConsolidatedFix::observe(&mut self.fix.speed_kmh, rmc.speed_kmh, now);
                ConsolidatedFix::observe(&mut self.fix.course_deg, rmc.course_deg, now);
            }
            FixUpdate::Vtg(vtg) => {
                ConsolidatedFix::observe(&mut self.fix.course_deg, vtg.course_deg, now);
                ConsolidatedFix::observe(&mut self.fix.speed_kmh, vtg.speed_kmh, now);
            }
        }
        self.seen_since_emit.insert(kind);
        debug!(?kind, "merged fix update");
    }

    /// True once every epoch kind has been merged since the last emission
    /// and `now` is strictly later than the last emission instant
    pub fn is_ready_to_emit(&self, now: Instant) -> bool {
        let epoch_complete = self
            .config
            .epoch_kinds
            .iter()
            .all(|kind| self.seen_since_emit.contains(kind));
        let later_than_last = self.last_emitted.map_or(true, |last| now > last);
        epoch_complete && later_than_last
    }

    /// Immutable snapshot of the current fix with ages resolved at `now`
    pub fn snapshot(&self, now: Instant) -> FixSnapshot {
        self.fix.snapshot(now)
    }

    /// Record an emission: starts the next epoch
    ///
    /// Called once per emitted row, whether or not the write succeeds; a
    /// failed write drops that row rather than re-emitting the same epoch.
    pub fn mark_emitted(&mut self, now: Instant) {
        self.seen_since_emit.clear();
        self.last_emitted = Some(now);
    }

    /// Instant of the last emission, if any
    pub fn last_emitted(&self) -> Option<Instant> {
        self.last_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmea_protocol::{GgaUpdate, RmcUpdate, VtgUpdate};
    use std::time::Duration;

    fn gga(satellites: Option<u32>, hdop: Option<f64>) -> FixUpdate {
        FixUpdate::Gga(GgaUpdate {
            fix_valid: true,
            satellites,
            hdop,
            latitude: None,
            longitude: None,
            altitude_m: None,
        })
    }

    fn rmc(latitude: Option<f64>, longitude: Option<f64>) -> FixUpdate {
        FixUpdate::Rmc(RmcUpdate {
            fix_valid: true,
            datetime: None,
            latitude,
            longitude,
            speed_kmh: None,
            course_deg: None,
        })
    }

    #[test]
    fn test_merge_fuses_fields_with_independent_ages() {
        let mut agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(500);
        let t2 = t1 + Duration::from_millis(500);

        agg.merge(gga(Some(7), Some(1.2)), t0);
        agg.merge(rmc(Some(48.1), Some(11.5)), t1);

        let snapshot = agg.snapshot(t2);
        assert_eq!(snapshot.satellites.unwrap().value, 7);
        assert_eq!(snapshot.hdop.unwrap().value, 1.2);
        assert_eq!(snapshot.latitude.unwrap().value, 48.1);
        assert_eq!(snapshot.longitude.unwrap().value, 11.5);

        // Ages are per-field: the GGA fields are a full second old, the RMC
        // fields half a second.
        assert_eq!(snapshot.satellites.unwrap().age_ms, 1000);
        assert_eq!(snapshot.hdop.unwrap().age_ms, 1000);
        assert_eq!(snapshot.latitude.unwrap().age_ms, 500);
        assert_eq!(snapshot.longitude.unwrap().age_ms, 500);
    }

    #[test]
    fn test_unsupplied_fields_stay_unobserved() {
        let mut agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let now = Instant::now();

        agg.merge(gga(Some(5), None), now);

        let snapshot = agg.snapshot(now);
        assert!(snapshot.satellites.is_some());
        assert!(snapshot.hdop.is_none());
        assert!(snapshot.latitude.is_none());
        assert!(snapshot.speed_kmh.is_none());
        assert!(snapshot.datetime.is_none());
    }

    #[test]
    fn test_merge_preserves_prior_values() {
        let mut agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(100);

        agg.merge(gga(Some(7), Some(1.2)), t0);
        // Second GGA supplies satellites only; HDOP keeps value and stamp
        agg.merge(gga(Some(8), None), t1);

        let snapshot = agg.snapshot(t1);
        assert_eq!(snapshot.satellites.unwrap().value, 8);
        assert_eq!(snapshot.satellites.unwrap().age_ms, 0);
        assert_eq!(snapshot.hdop.unwrap().value, 1.2);
        assert_eq!(snapshot.hdop.unwrap().age_ms, 100);
    }

    #[test]
    fn test_epoch_trigger_requires_all_kinds() {
        let mut agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let now = Instant::now();

        assert!(!agg.is_ready_to_emit(now));
        agg.merge(gga(Some(7), None), now);
        assert!(!agg.is_ready_to_emit(now));
        agg.merge(rmc(Some(48.1), None), now);
        assert!(agg.is_ready_to_emit(now));

        // VTG alone never completes the default epoch
        agg.mark_emitted(now);
        agg.merge(
            FixUpdate::Vtg(VtgUpdate {
                course_deg: Some(10.0),
                speed_kmh: Some(3.0),
            }),
            now + Duration::from_millis(10),
        );
        assert!(!agg.is_ready_to_emit(now + Duration::from_millis(10)));
    }

    #[test]
    fn test_never_emits_twice_at_the_same_instant() {
        let mut agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let now = Instant::now();

        agg.merge(gga(Some(7), None), now);
        agg.merge(rmc(Some(48.1), None), now);
        assert!(agg.is_ready_to_emit(now));
        agg.mark_emitted(now);

        // Same instant, even with a fresh epoch: not ready
        agg.merge(gga(Some(7), None), now);
        agg.merge(rmc(Some(48.1), None), now);
        assert!(!agg.is_ready_to_emit(now));
        assert!(agg.is_ready_to_emit(now + Duration::from_nanos(1)));
    }

    #[test]
    fn test_snapshot_carries_identity() {
        let agg = FixAggregator::new("AA:BB:CC:DD:EE:FF", AggregatorConfig::default());
        let snapshot = agg.snapshot(Instant::now());
        assert_eq!(snapshot.mac_address, "AA:BB:CC:DD:EE:FF");
    }
}
