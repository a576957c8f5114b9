//! services/bot/src/web/state.rs
//!
//! Defines the state shared by every HTTP handler.

use crate::adapters::LivePresence;
use crate::config::Config;
use attendance_core::PresenceEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The ingest queue drained by the event processor.
    pub events: mpsc::Sender<PresenceEvent>,
    pub presence: Arc<LivePresence>,
}
