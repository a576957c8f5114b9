//! crates/attendance_core/src/dedup.rs
//!
//! Suppresses near-duplicate transitions delivered by the presence source.
//!
//! The gate keeps the last accepted fingerprint per `(user, kind)`. An event is
//! rejected only when it falls inside that kind's window *and* carries the same
//! fingerprint, so reconnect flaps are swallowed while two genuine clock-outs a
//! few minutes apart both go through.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::domain::{EventKind, UserId};

/// How much of the event time goes into a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintResolution {
    Seconds,
    Micros,
}

/// Per-kind suppression windows.
#[derive(Debug, Clone, Copy)]
pub struct DedupWindows {
    pub clock_in: Duration,
    pub clock_out: Duration,
    pub movement: Duration,
}

impl DedupWindows {
    pub fn for_kind(&self, kind: EventKind) -> Duration {
        match kind {
            EventKind::ClockIn => self.clock_in,
            EventKind::ClockOut => self.clock_out,
            EventKind::Move => self.movement,
        }
    }
}

impl Default for DedupWindows {
    fn default() -> Self {
        Self {
            clock_in: Duration::seconds(60),
            clock_out: Duration::seconds(60),
            movement: Duration::seconds(3),
        }
    }
}

#[derive(Debug, Clone)]
struct DedupRecord {
    last_accepted: DateTime<Utc>,
    fingerprint: [u8; 32],
}

#[derive(Debug)]
pub struct DedupGate {
    windows: DedupWindows,
    resolution: FingerprintResolution,
    records: HashMap<(UserId, EventKind), DedupRecord>,
}

impl DedupGate {
    pub fn new(windows: DedupWindows, resolution: FingerprintResolution) -> Self {
        Self {
            windows,
            resolution,
            records: HashMap::new(),
        }
    }

    /// Returns `true` if the event should be processed, recording it as the latest
    /// accepted one for its key. Rejected events leave the record untouched.
    pub fn admit(
        &mut self,
        user_id: &UserId,
        kind: EventKind,
        channel_name: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let fingerprint = fingerprint(user_id, kind, channel_name, at, self.resolution);
        let key = (user_id.clone(), kind);

        if let Some(last) = self.records.get(&key) {
            let within_window = at - last.last_accepted < self.windows.for_kind(kind);
            if within_window && last.fingerprint == fingerprint {
                return false;
            }
        }

        self.records.insert(
            key,
            DedupRecord {
                last_accepted: at,
                fingerprint,
            },
        );
        true
    }

    /// Drops records last accepted before `cutoff`. Returns how many were removed.
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.last_accepted >= cutoff);
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A stable digest of `(user, kind, channel, truncated time)`.
pub fn fingerprint(
    user_id: &UserId,
    kind: EventKind,
    channel_name: &str,
    at: DateTime<Utc>,
    resolution: FingerprintResolution,
) -> [u8; 32] {
    let truncated = match resolution {
        FingerprintResolution::Seconds => at.timestamp(),
        FingerprintResolution::Micros => at.timestamp_micros(),
    };

    let mut hasher = Sha256::new();
    hasher.update(user_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(channel_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(truncated.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn gate() -> DedupGate {
        DedupGate::new(DedupWindows::default(), FingerprintResolution::Seconds)
    }

    #[test]
    fn identical_event_inside_window_is_rejected() {
        let mut gate = gate();
        let alice = UserId::new("alice");

        assert!(gate.admit(&alice, EventKind::ClockIn, "office", t0()));
        assert!(!gate.admit(&alice, EventKind::ClockIn, "office", t0()));
    }

    #[test]
    fn subsecond_duplicates_collapse_at_second_resolution() {
        let mut gate = gate();
        let alice = UserId::new("alice");
        let later = t0() + Duration::milliseconds(400);

        assert!(gate.admit(&alice, EventKind::ClockOut, "office", t0()));
        assert!(!gate.admit(&alice, EventKind::ClockOut, "office", later));
    }

    #[test]
    fn micro_resolution_tells_subsecond_events_apart() {
        let mut gate = DedupGate::new(DedupWindows::default(), FingerprintResolution::Micros);
        let alice = UserId::new("alice");
        let later = t0() + Duration::milliseconds(400);

        assert!(gate.admit(&alice, EventKind::ClockOut, "office", t0()));
        assert!(gate.admit(&alice, EventKind::ClockOut, "office", later));
    }

    #[test]
    fn distinct_sequential_actions_pass() {
        let mut gate = gate();
        let alice = UserId::new("alice");

        assert!(gate.admit(&alice, EventKind::ClockOut, "office", t0()));
        assert!(gate.admit(
            &alice,
            EventKind::ClockOut,
            "office",
            t0() + Duration::minutes(5)
        ));
    }

    #[test]
    fn different_channel_is_not_a_duplicate() {
        let mut gate = gate();
        let alice = UserId::new("alice");

        assert!(gate.admit(&alice, EventKind::Move, "office", t0()));
        assert!(gate.admit(&alice, EventKind::Move, "lab", t0()));
    }

    #[test]
    fn same_fingerprint_after_window_passes() {
        let mut gate = DedupGate::new(
            DedupWindows {
                movement: Duration::seconds(0),
                ..DedupWindows::default()
            },
            FingerprintResolution::Seconds,
        );
        let alice = UserId::new("alice");

        assert!(gate.admit(&alice, EventKind::Move, "office", t0()));
        assert!(gate.admit(&alice, EventKind::Move, "office", t0()));
    }

    #[test]
    fn users_and_kinds_are_keyed_separately() {
        let mut gate = gate();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        assert!(gate.admit(&alice, EventKind::ClockIn, "office", t0()));
        assert!(gate.admit(&bob, EventKind::ClockIn, "office", t0()));
        assert!(gate.admit(&alice, EventKind::ClockOut, "office", t0()));
        assert_eq!(gate.len(), 3);
    }

    #[test]
    fn eviction_drops_only_stale_records() {
        let mut gate = gate();
        gate.admit(&UserId::new("alice"), EventKind::ClockIn, "office", t0());
        gate.admit(
            &UserId::new("bob"),
            EventKind::ClockIn,
            "office",
            t0() + Duration::hours(3),
        );

        let removed = gate.evict_older_than(t0() + Duration::hours(1));
        assert_eq!(removed, 1);
        assert_eq!(gate.len(), 1);
    }
}
