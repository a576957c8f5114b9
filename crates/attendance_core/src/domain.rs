//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for attendance tracking.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;

/// A stable, opaque identifier for a tracked member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel a member can be present in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

/// A raw membership change as delivered by the presence source.
#[derive(Debug, Clone)]
pub struct PresenceEvent {
    pub user_id: UserId,
    pub display_name: String,
    pub before: Option<ChannelRef>,
    pub after: Option<ChannelRef>,
    pub occurred_at: DateTime<Utc>,
}

/// The semantic meaning of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ClockIn,
    ClockOut,
    Move,
    None,
}

impl Transition {
    /// The dedup key for transitions that carry meaning.
    pub fn kind(self) -> Option<EventKind> {
        match self {
            Transition::ClockIn => Some(EventKind::ClockIn),
            Transition::ClockOut => Some(EventKind::ClockOut),
            Transition::Move => Some(EventKind::Move),
            Transition::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ClockIn,
    ClockOut,
    Move,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ClockIn => "clock_in",
            EventKind::ClockOut => "clock_out",
            EventKind::Move => "move",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open attendance period for one member.
#[derive(Debug, Clone)]
pub struct AttendanceSession {
    pub user_id: UserId,
    pub display_name: String,
    pub channel_name: String,
    pub clock_in_time: DateTime<Utc>,
    pub accumulated_rest_seconds: i64,
}

/// The outcome of closing a session, copied out for message formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockOutSummary {
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: DateTime<Utc>,
    pub work_seconds: i64,
    pub rest_seconds: i64,
}

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutReason {
    /// The member left their last channel.
    Explicit,
    /// The sweeper no longer observed the member anywhere.
    Inferred,
}

/// A notification-worthy outcome of the state path, handed to the dispatcher by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ClockIn {
        user_id: UserId,
        display_name: String,
        channel: String,
        at: DateTime<Utc>,
    },
    Move {
        user_id: UserId,
        display_name: String,
        channel: String,
        at: DateTime<Utc>,
    },
    RestStarted {
        user_id: UserId,
        display_name: String,
        at: DateTime<Utc>,
    },
    RestEnded {
        user_id: UserId,
        display_name: String,
        rest_seconds: i64,
        at: DateTime<Utc>,
    },
    ClockOut {
        user_id: UserId,
        display_name: String,
        channel: String,
        at: DateTime<Utc>,
        summary: ClockOutSummary,
        reason: ClockOutReason,
    },
}

impl Notice {
    pub fn user_id(&self) -> &UserId {
        match self {
            Notice::ClockIn { user_id, .. }
            | Notice::Move { user_id, .. }
            | Notice::RestStarted { user_id, .. }
            | Notice::RestEnded { user_id, .. }
            | Notice::ClockOut { user_id, .. } => user_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Notice::ClockIn { display_name, .. }
            | Notice::Move { display_name, .. }
            | Notice::RestStarted { display_name, .. }
            | Notice::RestEnded { display_name, .. }
            | Notice::ClockOut { display_name, .. } => display_name,
        }
    }
}

/// A single outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub text: String,
    pub thread_id: Option<String>,
    pub mention_id: Option<String>,
}

impl OutboundMessage {
    pub fn new(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            text: text.into(),
            thread_id: None,
            mention_id: None,
        }
    }

    pub fn in_thread(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn mentioning(mut self, mention_id: Option<String>) -> Self {
        self.mention_id = mention_id;
        self
    }
}

/// Whether an attendance row records the start or the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    ClockIn,
    ClockOut,
}

/// One row for an external attendance sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub display_name: String,
    pub status: AttendanceStatus,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    /// Already formatted for humans, empty for clock-ins.
    pub work_duration: String,
}
