//! services/bot/src/web/protocol.rs
//!
//! Defines the JSON payloads the presence relay sends to the bot.

use attendance_core::{ChannelRef, PresenceEvent, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A channel as the presence source identifies it.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct ChannelPayload {
    pub id: String,
    pub name: String,
}

impl From<ChannelPayload> for ChannelRef {
    fn from(payload: ChannelPayload) -> Self {
        ChannelRef {
            id: payload.id,
            name: payload.name,
        }
    }
}

/// One membership change: the member was in `before` and is now in `after`.
/// A missing channel means "not in any channel".
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct PresenceEventPayload {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub before: Option<ChannelPayload>,
    #[serde(default)]
    pub after: Option<ChannelPayload>,
    /// Defaults to the time the bot received the event.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl PresenceEventPayload {
    pub fn into_event(self, received_at: DateTime<Utc>) -> PresenceEvent {
        PresenceEvent {
            user_id: UserId::new(self.user_id),
            display_name: self.display_name,
            before: self.before.map(Into::into),
            after: self.after.map(Into::into),
            occurred_at: self.occurred_at.unwrap_or(received_at),
        }
    }
}

/// A member currently present in a channel.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct MemberPresence {
    pub user_id: String,
    pub channel: ChannelPayload,
}

/// The relay's complete view of who is where.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct PresenceSnapshotPayload {
    pub members: Vec<MemberPresence>,
}

/// Returned after a snapshot has been applied.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SnapshotResponse {
    pub present: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_fields_default_to_absent() {
        let payload: PresenceEventPayload =
            serde_json::from_str(r#"{"user_id":"1","display_name":"Alice","after":{"id":"9","name":"office"}}"#)
                .unwrap();
        let received = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        let event = payload.into_event(received);

        assert!(event.before.is_none());
        assert_eq!(event.after.unwrap().name, "office");
        assert_eq!(event.occurred_at, received);
    }

    #[test]
    fn explicit_timestamp_is_kept() {
        let payload: PresenceEventPayload = serde_json::from_str(
            r#"{"user_id":"1","display_name":"Alice","before":null,"after":null,"occurred_at":"2024-04-01T09:00:00Z"}"#,
        )
        .unwrap();

        let event = payload.into_event(Utc::now());
        assert_eq!(
            event.occurred_at,
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
        );
    }
}
