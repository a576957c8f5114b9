//! services/bot/src/engine/mod.rs
//!
//! Wires the attendance pipeline together:
//! ingest queue -> event processor -> notice queue -> dispatcher, with the sweeper
//! feeding the same notice queue on its own schedule.

pub mod dispatcher;
pub mod processor;
pub mod retry;
pub mod sweeper;

use attendance_core::{
    AttendanceBook, AttendanceExport, DedupGate, IdentityResolver, Notice, NotificationService,
    PresenceEvent,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapters::LivePresence;
use crate::config::Config;
use dispatcher::Dispatcher;
use processor::EventProcessor;
use retry::RetryPolicy;
use sweeper::Sweeper;

pub const INGEST_QUEUE_CAPACITY: usize = 1024;
pub const NOTICE_QUEUE_CAPACITY: usize = 256;

/// All per-member attendance state. Only ever touched under the shared lock.
#[derive(Debug)]
pub struct AttendanceState {
    pub book: AttendanceBook,
    pub gate: DedupGate,
}

pub type SharedAttendance = Arc<Mutex<AttendanceState>>;

impl AttendanceState {
    pub fn shared(gate: DedupGate) -> SharedAttendance {
        Arc::new(Mutex::new(Self {
            book: AttendanceBook::new(),
            gate,
        }))
    }
}

/// The outbound collaborators the engine needs.
pub struct Ports {
    pub notifier: Arc<dyn NotificationService>,
    pub identity: Arc<dyn IdentityResolver>,
    pub export: Arc<dyn AttendanceExport>,
}

/// Handles to the engine's background tasks.
pub struct Engine {
    pub events: mpsc::Sender<PresenceEvent>,
    pub state: SharedAttendance,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Spawns the processor, dispatcher and sweeper tasks.
    pub fn start(
        config: &Config,
        presence: Arc<LivePresence>,
        ports: Ports,
        cancel: CancellationToken,
    ) -> Self {
        let state = AttendanceState::shared(DedupGate::new(
            config.dedup_windows,
            config.dedup_resolution,
        ));
        let (event_tx, event_rx) = mpsc::channel::<PresenceEvent>(INGEST_QUEUE_CAPACITY);
        let (notice_tx, notice_rx) = mpsc::channel::<Notice>(NOTICE_QUEUE_CAPACITY);

        let processor = EventProcessor::new(
            state.clone(),
            presence.clone(),
            config.user_filter.clone(),
            config.rest_channel_name.clone(),
        );
        let dispatcher = Dispatcher {
            notifier: ports.notifier,
            identity: ports.identity,
            export: ports.export,
            templates: config.templates.clone(),
            offset: config.utc_offset,
            attendance_channel_id: config.slack_channel_id.clone(),
            report_channel_id: config.daily_report_channel_id.clone(),
            retry: RetryPolicy::new(config.notify_max_attempts, config.notify_backoff_base),
            follow_up_delay: config.follow_up_delay,
            cancel: cancel.clone(),
        };
        let sweeper = Sweeper {
            state: state.clone(),
            presence,
            interval: config.sweep_interval,
            grace: config.sweep_grace,
            retention: config.state_retention,
        };

        let tasks = vec![
            tokio::spawn(processor.run(event_rx, notice_tx.clone(), cancel.clone())),
            tokio::spawn(sweeper.run(notice_tx, cancel)),
            tokio::spawn(dispatcher.run(notice_rx)),
        ];

        Self {
            events: event_tx,
            state,
            tasks,
        }
    }

    /// Waits for every task to finish after shutdown has been signalled.
    pub async fn join(self) {
        drop(self.events);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Engine task ended abnormally");
            }
        }
    }
}
