//! crates/attendance_core/src/book.rs
//!
//! The attendance book: open sessions and open rest intervals, keyed by member.
//!
//! The book is plain data with `&mut self` operations and explicit timestamps. The
//! service wraps it in a single lock shared by the event path and the sweeper, which
//! is what keeps per-member read-modify-write sequences from interleaving.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{AttendanceSession, ClockOutSummary, UserId};
use crate::duration::work_seconds;

#[derive(Debug, Default)]
pub struct AttendanceBook {
    sessions: HashMap<UserId, AttendanceSession>,
    rests: HashMap<UserId, DateTime<Utc>>,
}

impl AttendanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session unless one is already open. Returns whether a session was opened.
    pub fn clock_in(
        &mut self,
        user_id: &UserId,
        display_name: &str,
        channel_name: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if self.sessions.contains_key(user_id) {
            return false;
        }
        self.sessions.insert(
            user_id.clone(),
            AttendanceSession {
                user_id: user_id.clone(),
                display_name: display_name.to_string(),
                channel_name: channel_name.to_string(),
                clock_in_time: now,
                accumulated_rest_seconds: 0,
            },
        );
        true
    }

    /// Closes the member's session. `None` if nothing was open.
    pub fn clock_out(&mut self, user_id: &UserId, now: DateTime<Utc>) -> Option<ClockOutSummary> {
        let session = self.sessions.remove(user_id)?;
        Some(ClockOutSummary {
            clock_in_time: session.clock_in_time,
            clock_out_time: now,
            work_seconds: work_seconds(
                session.clock_in_time,
                now,
                session.accumulated_rest_seconds,
            ),
            rest_seconds: session.accumulated_rest_seconds,
        })
    }

    /// Remembers the channel the member is currently in, for messages the sweeper composes.
    pub fn note_channel(&mut self, user_id: &UserId, channel_name: &str) {
        if let Some(session) = self.sessions.get_mut(user_id) {
            session.channel_name = channel_name.to_string();
        }
    }

    /// Opens a rest interval, replacing any stale one.
    pub fn start_rest(&mut self, user_id: &UserId, now: DateTime<Utc>) {
        self.rests.insert(user_id.clone(), now);
    }

    /// Closes the member's rest interval and returns its length in seconds.
    ///
    /// The length is added to the open session if there is one; otherwise it is
    /// dropped. `None` if no interval was recorded.
    pub fn end_rest(&mut self, user_id: &UserId, now: DateTime<Utc>) -> Option<i64> {
        let started = self.rests.remove(user_id)?;
        let seconds = (now - started).num_seconds().max(0);
        if let Some(session) = self.sessions.get_mut(user_id) {
            session.accumulated_rest_seconds += seconds;
        }
        Some(seconds)
    }

    pub fn is_resting(&self, user_id: &UserId) -> bool {
        self.rests.contains_key(user_id)
    }

    pub fn session(&self, user_id: &UserId) -> Option<&AttendanceSession> {
        self.sessions.get(user_id)
    }

    /// A snapshot of every open session.
    pub fn open_sessions(&self) -> Vec<AttendanceSession> {
        self.sessions.values().cloned().collect()
    }

    /// Drops rest intervals opened before `cutoff` for members with no open session.
    pub fn evict_rests_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.rests.len();
        let sessions = &self.sessions;
        self.rests
            .retain(|user_id, started| *started >= cutoff || sessions.contains_key(user_id));
        before - self.rests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::format_hhmm;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn second_clock_in_is_a_no_op() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        assert!(book.clock_in(&alice, "Alice", "office", t0()));
        assert!(!book.clock_in(&alice, "Alice", "office", t0() + secs(30)));
        assert_eq!(book.open_sessions().len(), 1);
        assert_eq!(book.session(&alice).unwrap().clock_in_time, t0());
    }

    #[test]
    fn rest_interval_is_subtracted_from_work() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        book.clock_in(&alice, "Alice", "office", t0());
        book.start_rest(&alice, t0() + secs(60));
        assert_eq!(book.end_rest(&alice, t0() + secs(180)), Some(120));
        let summary = book.clock_out(&alice, t0() + secs(600)).unwrap();

        assert_eq!(summary.work_seconds, 480);
        assert_eq!(summary.rest_seconds, 120);
        assert_eq!(format_hhmm(summary.work_seconds), "00:08");
        assert!(book.session(&alice).is_none());
    }

    #[test]
    fn repeated_rests_accumulate() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        book.clock_in(&alice, "Alice", "office", t0());
        book.start_rest(&alice, t0() + secs(10));
        book.end_rest(&alice, t0() + secs(40));
        book.start_rest(&alice, t0() + secs(100));
        book.end_rest(&alice, t0() + secs(160));

        assert_eq!(book.session(&alice).unwrap().accumulated_rest_seconds, 90);
    }

    #[test]
    fn leaving_rest_without_an_entry_contributes_nothing() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        book.clock_in(&alice, "Alice", "office", t0());
        assert_eq!(book.end_rest(&alice, t0() + secs(60)), None);
        assert_eq!(book.session(&alice).unwrap().accumulated_rest_seconds, 0);
    }

    #[test]
    fn rest_without_a_session_is_discarded() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        book.start_rest(&alice, t0());
        assert_eq!(book.end_rest(&alice, t0() + secs(300)), Some(300));
        book.clock_in(&alice, "Alice", "office", t0() + secs(301));

        assert_eq!(book.session(&alice).unwrap().accumulated_rest_seconds, 0);
    }

    #[test]
    fn restarting_rest_overwrites_the_stale_start() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");

        book.clock_in(&alice, "Alice", "office", t0());
        book.start_rest(&alice, t0());
        book.start_rest(&alice, t0() + secs(100));
        assert_eq!(book.end_rest(&alice, t0() + secs(130)), Some(30));
    }

    #[test]
    fn clock_out_without_session_is_benign() {
        let mut book = AttendanceBook::new();
        assert!(book.clock_out(&UserId::new("ghost"), t0()).is_none());
    }

    #[test]
    fn members_do_not_affect_each_other() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        book.clock_in(&alice, "Alice", "office", t0());
        book.clock_in(&bob, "Bob", "office", t0() + secs(5));
        book.clock_out(&bob, t0() + secs(6));

        let session = book.session(&alice).unwrap();
        assert_eq!(session.clock_in_time, t0());
        assert_eq!(session.accumulated_rest_seconds, 0);
    }

    #[test]
    fn eviction_keeps_rests_of_open_sessions() {
        let mut book = AttendanceBook::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        book.clock_in(&alice, "Alice", "office", t0());
        book.start_rest(&alice, t0());
        book.start_rest(&bob, t0());

        assert_eq!(book.evict_rests_older_than(t0() + Duration::hours(13)), 1);
        assert!(book.is_resting(&alice));
        assert!(!book.is_resting(&bob));
    }
}
