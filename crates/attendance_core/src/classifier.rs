//! crates/attendance_core/src/classifier.rs
//!
//! Maps a before/after channel pair to its attendance meaning.

use crate::domain::{ChannelRef, Transition};

/// Classifies a membership change. Channels are compared by id.
pub fn classify(before: Option<&ChannelRef>, after: Option<&ChannelRef>) -> Transition {
    match (before, after) {
        (None, Some(_)) => Transition::ClockIn,
        (Some(_), None) => Transition::ClockOut,
        (Some(b), Some(a)) if b.id != a.id => Transition::Move,
        _ => Transition::None,
    }
}
