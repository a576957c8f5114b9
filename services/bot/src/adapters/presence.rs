//! services/bot/src/adapters/presence.rs
//!
//! The live membership view: who is currently in which channel.
//!
//! The event processor feeds every transition through `observe`, and the relay may
//! replace the whole view with a fresh snapshot after it reconnects. The sweeper
//! reads it through the `PresenceView` port.

use attendance_core::{ChannelRef, PresenceEvent, PresenceView, UserId};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct LivePresence {
    members: RwLock<HashMap<UserId, ChannelRef>>,
}

impl LivePresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transition to the view.
    pub fn observe(&self, event: &PresenceEvent) {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        match &event.after {
            Some(channel) => {
                members.insert(event.user_id.clone(), channel.clone());
            }
            None => {
                members.remove(&event.user_id);
            }
        }
    }

    /// Replaces the view with a full membership list.
    pub fn replace(&self, snapshot: impl IntoIterator<Item = (UserId, ChannelRef)>) {
        let fresh: HashMap<UserId, ChannelRef> = snapshot.into_iter().collect();
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        *members = fresh;
    }

    pub fn len(&self) -> usize {
        self.members.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PresenceView for LivePresence {
    fn is_present(&self, user_id: &UserId) -> bool {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members.contains_key(user_id)
    }
}
