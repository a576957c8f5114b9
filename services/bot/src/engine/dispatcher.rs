//! services/bot/src/engine/dispatcher.rs
//!
//! The notification dispatcher: renders notices, posts them through the retry policy,
//! threads the daily-report reminder under clock-outs, and forwards attendance rows
//! to the export port.
//!
//! Nothing here feeds back into attendance state. A failed post is logged and dropped.

use attendance_core::{
    AttendanceExport, AttendanceRecord, AttendanceStatus, IdentityResolver, MessageId, Notice,
    NotificationService, OutboundMessage, Templates,
};
use attendance_core::duration::format_hhmm;
use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::retry::RetryPolicy;

#[derive(Clone)]
pub struct Dispatcher {
    pub notifier: Arc<dyn NotificationService>,
    pub identity: Arc<dyn IdentityResolver>,
    pub export: Arc<dyn AttendanceExport>,
    pub templates: Templates,
    pub offset: FixedOffset,
    pub attendance_channel_id: String,
    pub report_channel_id: String,
    pub retry: RetryPolicy,
    pub follow_up_delay: Duration,
    pub cancel: CancellationToken,
}

impl Dispatcher {
    /// Consumes notices until the queue closes or shutdown is signalled.
    pub async fn run(self, mut notices: mpsc::Receiver<Notice>) {
        info!("Notification dispatcher started.");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = notices.recv() => match next {
                    Some(notice) => self.dispatch(notice).await,
                    None => break,
                },
            }
        }
        info!("Notification dispatcher stopped.");
    }

    /// Handles one notice end to end.
    pub async fn dispatch(&self, notice: Notice) {
        let text = self.templates.render(&notice, self.offset);
        let posted = self
            .send(OutboundMessage::new(&self.attendance_channel_id, text))
            .await;

        match &notice {
            Notice::ClockIn { display_name, at, .. } => {
                self.export(AttendanceRecord {
                    display_name: display_name.clone(),
                    status: AttendanceStatus::ClockIn,
                    clock_in: Some(*at),
                    clock_out: None,
                    work_duration: String::new(),
                })
                .await;
            }
            Notice::ClockOut {
                display_name,
                at,
                summary,
                ..
            } => {
                self.follow_up(display_name, posted).await;
                self.export(AttendanceRecord {
                    display_name: display_name.clone(),
                    status: AttendanceStatus::ClockOut,
                    clock_in: Some(summary.clock_in_time),
                    clock_out: Some(*at),
                    work_duration: format_hhmm(summary.work_seconds),
                })
                .await;
            }
            _ => {}
        }
    }

    /// Posts one message with retries. Returns the message id, or `None` once the
    /// attempts are used up or shutdown interrupts them.
    pub async fn send(&self, message: OutboundMessage) -> Option<MessageId> {
        let notifier = self.notifier.clone();
        let result = self
            .retry
            .run("post_message", &self.cancel, |attempt| {
                let notifier = notifier.clone();
                let message = message.clone();
                async move {
                    debug!(attempt, "Posting message");
                    notifier.post(&message).await
                }
            })
            .await;

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, "Dropping notification");
                None
            }
        }
    }

    /// Posts the daily-report reminder, mentioning the member when they can be resolved.
    async fn follow_up(&self, display_name: &str, parent: Option<MessageId>) {
        // Let the chat platform index the parent before replying to it.
        tokio::select! {
            _ = self.cancel.cancelled() => return,
            _ = tokio::time::sleep(self.follow_up_delay) => {}
        }

        let mention = match self.identity.resolve(display_name).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                warn!(display_name, "No chat identity found; posting follow-up without a mention");
                None
            }
            Err(e) => {
                warn!(display_name, error = %e, "Identity lookup failed; posting follow-up without a mention");
                None
            }
        };

        if parent.is_none() {
            warn!(display_name, "Clock-out post failed; follow-up goes to the channel instead");
        }

        let text = self.templates.render_follow_up(&self.report_channel_id);
        let message = OutboundMessage::new(&self.attendance_channel_id, text)
            .in_thread(parent)
            .mentioning(mention);
        self.send(message).await;
    }

    async fn export(&self, record: AttendanceRecord) {
        if let Err(e) = self.export.record(&record).await {
            warn!(display_name = %record.display_name, error = %e, "Attendance export failed");
        }
    }
}
