//! services/bot/src/engine/processor.rs
//!
//! This module contains the asynchronous "worker" that turns presence events into
//! attendance state changes and notices.
//!
//! Events are dequeued one at a time and applied under the shared attendance lock,
//! so a member's clock-in is always fully applied before their next move or
//! clock-out. The lock is released before the notice is queued for delivery.

use attendance_core::{
    classify, ChannelRef, ClockOutReason, Notice, PresenceEvent, Transition,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::LivePresence;
use crate::config::UserFilter;
use crate::engine::SharedAttendance;

pub struct EventProcessor {
    state: SharedAttendance,
    presence: Arc<LivePresence>,
    filter: UserFilter,
    rest_channel_name: String,
}

impl EventProcessor {
    pub fn new(
        state: SharedAttendance,
        presence: Arc<LivePresence>,
        filter: UserFilter,
        rest_channel_name: String,
    ) -> Self {
        Self {
            state,
            presence,
            filter,
            rest_channel_name,
        }
    }

    /// The main loop: applies queued events in arrival order until shutdown.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<PresenceEvent>,
        notices: mpsc::Sender<Notice>,
        cancel: CancellationToken,
    ) {
        info!("Event processor started.");
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                next = events.recv() => match next {
                    Some(event) => event,
                    None => break,
                },
            };

            if let Some(notice) = self.apply(event).await {
                if notices.send(notice).await.is_err() {
                    warn!("Notice queue closed; stopping event processor.");
                    break;
                }
            }
        }
        info!("Event processor stopped.");
    }

    /// Applies one event and returns the notice it produces, if any.
    pub async fn apply(&self, event: PresenceEvent) -> Option<Notice> {
        let user_id = &event.user_id;
        if !self.filter.permits(user_id) {
            debug!(%user_id, "Ignoring untracked member");
            return None;
        }

        self.presence.observe(&event);

        let transition = classify(event.before.as_ref(), event.after.as_ref());
        let kind = transition.kind()?;
        let channel_name = event
            .after
            .as_ref()
            .or(event.before.as_ref())
            .map(|channel| channel.name.clone())
            .unwrap_or_default();
        let left_rest = self.is_rest(event.before.as_ref());
        let entered_rest = self.is_rest(event.after.as_ref());
        let now = event.occurred_at;
        let display_name = event.display_name.clone();

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if !state.gate.admit(user_id, kind, &channel_name, now) {
            debug!(%user_id, %kind, channel = %channel_name, "Suppressed duplicate transition");
            return None;
        }

        // Rest bookkeeping comes first so a clock-out from the rest channel folds the
        // final interval into the session before it is closed.
        let rested = if left_rest {
            state.book.end_rest(user_id, now)
        } else {
            None
        };
        if entered_rest {
            state.book.start_rest(user_id, now);
        }

        let notice = match transition {
            Transition::ClockIn if entered_rest => {
                debug!(%user_id, "Joined the rest channel directly; not a clock-in");
                None
            }
            Transition::ClockIn => {
                if state
                    .book
                    .clock_in(user_id, &display_name, &channel_name, now)
                {
                    Some(Notice::ClockIn {
                        user_id: user_id.clone(),
                        display_name,
                        channel: channel_name,
                        at: now,
                    })
                } else {
                    debug!(%user_id, "Already clocked in");
                    None
                }
            }
            Transition::Move if entered_rest => {
                state.book.session(user_id).map(|_| Notice::RestStarted {
                    user_id: user_id.clone(),
                    display_name,
                    at: now,
                })
            }
            Transition::Move if state.book.session(user_id).is_none() => {
                // Came out of the rest channel (or was never seen joining): start work here.
                state
                    .book
                    .clock_in(user_id, &display_name, &channel_name, now);
                Some(Notice::ClockIn {
                    user_id: user_id.clone(),
                    display_name,
                    channel: channel_name,
                    at: now,
                })
            }
            Transition::Move => {
                state.book.note_channel(user_id, &channel_name);
                if left_rest {
                    Some(Notice::RestEnded {
                        user_id: user_id.clone(),
                        display_name,
                        rest_seconds: rested.unwrap_or(0),
                        at: now,
                    })
                } else {
                    Some(Notice::Move {
                        user_id: user_id.clone(),
                        display_name,
                        channel: channel_name,
                        at: now,
                    })
                }
            }
            Transition::ClockOut => match state.book.clock_out(user_id, now) {
                Some(summary) => Some(Notice::ClockOut {
                    user_id: user_id.clone(),
                    display_name,
                    channel: channel_name,
                    at: now,
                    summary,
                    reason: ClockOutReason::Explicit,
                }),
                None => {
                    // Already swept, a repeated disconnect, or a rest-only visit.
                    debug!(%user_id, "Clock-out without an open session; nothing to close");
                    None
                }
            },
            Transition::None => None,
        };
        drop(guard);

        if let Some(notice) = &notice {
            info!(%user_id, %kind, "Attendance transition applied");
            debug!(?notice);
        }
        notice
    }

    fn is_rest(&self, channel: Option<&ChannelRef>) -> bool {
        channel.is_some_and(|channel| channel.name == self.rest_channel_name)
    }
}
