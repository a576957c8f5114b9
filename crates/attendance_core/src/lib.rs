pub mod book;
pub mod classifier;
pub mod dedup;
pub mod domain;
pub mod duration;
pub mod ports;
pub mod templates;

pub use book::AttendanceBook;
pub use classifier::classify;
pub use dedup::{DedupGate, DedupWindows, FingerprintResolution};
pub use domain::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, ChannelRef, ClockOutReason,
    ClockOutSummary, EventKind, Notice, OutboundMessage, PresenceEvent, Transition, UserId,
};
pub use ports::{
    AttendanceExport, IdentityResolver, MessageId, NotificationService, PortError, PortResult,
    PresenceView,
};
pub use templates::Templates;
