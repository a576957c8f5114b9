//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) the attendance core needs from the outside world.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the chat platform, the presence source and the spreadsheet sink.

use async_trait::async_trait;
use crate::domain::{AttendanceRecord, OutboundMessage, UserId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, JSON).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The remote service answered, but refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The credentials were refused; retrying will not help.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The id the chat platform assigns to a posted message; used as a thread parent.
pub type MessageId = String;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Posts one message. A transport failure and an application-level "not ok"
    /// are both reported as errors.
    async fn post(&self, message: &OutboundMessage) -> PortResult<MessageId>;
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Maps a display name to the chat platform's mention id.
    async fn resolve(&self, display_name: &str) -> PortResult<Option<String>>;

    /// Pre-loads the directory so the first lookups don't pay for a refresh.
    async fn warm(&self) -> PortResult<()> {
        Ok(())
    }
}

/// The live membership view of the presence source.
pub trait PresenceView: Send + Sync {
    fn is_present(&self, user_id: &UserId) -> bool;
}

#[async_trait]
pub trait AttendanceExport: Send + Sync {
    /// Appends one attendance row to the member's sheet.
    async fn record(&self, record: &AttendanceRecord) -> PortResult<()>;
}
