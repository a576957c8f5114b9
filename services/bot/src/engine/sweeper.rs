//! services/bot/src/engine/sweeper.rs
//!
//! The reconciliation sweeper: a periodic pass that closes sessions whose owner is no
//! longer present anywhere, and evicts stale bookkeeping.

use attendance_core::{ClockOutReason, Notice, PresenceView};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::SharedAttendance;

pub struct Sweeper {
    pub state: SharedAttendance,
    pub presence: Arc<dyn PresenceView>,
    pub interval: Duration,
    /// Minimum session age before an absent member is clocked out.
    pub grace: chrono::Duration,
    /// Dedup records and orphaned rest intervals older than this are dropped.
    pub retention: chrono::Duration,
}

impl Sweeper {
    /// Sweeps on every tick until shutdown.
    pub async fn run(self, notices: mpsc::Sender<Notice>, cancel: CancellationToken) {
        info!(interval = ?self.interval, "Reconciliation sweeper started.");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for notice in self.sweep_once(Utc::now()).await {
                if let Err(e) = notices.send(notice).await {
                    error!(user_id = %e.0.user_id(), "Notice queue closed; inferred clock-out not delivered");
                }
            }
        }
        info!("Reconciliation sweeper stopped.");
    }

    /// One pass at `now`. Returns a notice for every session it closed.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let mut state = self.state.lock().await;
        let mut closed = Vec::new();

        for session in state.book.open_sessions() {
            if self.presence.is_present(&session.user_id) {
                continue;
            }
            if now - session.clock_in_time < self.grace {
                debug!(user_id = %session.user_id, "Absent but inside the grace period");
                continue;
            }

            // An interval still open at disconnect counts as rest up to now.
            state.book.end_rest(&session.user_id, now);
            let Some(summary) = state.book.clock_out(&session.user_id, now) else {
                continue;
            };
            info!(user_id = %session.user_id, "Inferred clock-out after lost connection");
            closed.push(Notice::ClockOut {
                user_id: session.user_id,
                display_name: session.display_name,
                channel: session.channel_name,
                at: now,
                summary,
                reason: ClockOutReason::Inferred,
            });
        }

        match now.checked_sub_signed(self.retention) {
            Some(cutoff) => {
                let dropped_records = state.gate.evict_older_than(cutoff);
                let dropped_rests = state.book.evict_rests_older_than(cutoff);
                if dropped_records + dropped_rests > 0 {
                    debug!(dropped_records, dropped_rests, "Evicted stale attendance bookkeeping");
                }
            }
            None => warn!(
                retention = ?self.retention,
                "Retention reaches past the calendar; skipping eviction"
            ),
        }

        closed
    }
}
