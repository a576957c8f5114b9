//! services/bot/src/web/rest.rs
//!
//! Contains the Axum handlers for the HTTP endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    protocol::{
        ChannelPayload, MemberPresence, PresenceEventPayload, PresenceSnapshotPayload,
        SnapshotResponse,
    },
    state::AppState,
};
use attendance_core::{ChannelRef, UserId};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        ingest_event_handler,
        replace_presence_handler,
    ),
    components(
        schemas(
            ChannelPayload,
            PresenceEventPayload,
            MemberPresence,
            PresenceSnapshotPayload,
            SnapshotResponse,
        )
    ),
    tags(
        (name = "Attendance Bot API", description = "Presence ingestion and liveness endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// HTTP Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The process is up", body = String))
)]
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Queue one membership change for processing.
///
/// The event is applied asynchronously; a 202 only means it was queued.
#[utoipa::path(
    post,
    path = "/events",
    request_body = PresenceEventPayload,
    responses(
        (status = 202, description = "Event queued"),
        (status = 401, description = "Missing or wrong ingest token"),
        (status = 503, description = "The ingest queue is full or shutting down")
    )
)]
pub async fn ingest_event_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PresenceEventPayload>,
) -> Result<StatusCode, (StatusCode, String)> {
    let event = payload.into_event(Utc::now());

    match app_state.events.try_send(event) {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(TrySendError::Full(event)) => {
            warn!(user_id = %event.user_id, "Ingest queue full; rejecting event");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Ingest queue is full".to_string(),
            ))
        }
        Err(TrySendError::Closed(_)) => {
            error!("Ingest queue closed; the event processor has stopped");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Event processing is shutting down".to_string(),
            ))
        }
    }
}

/// Replace the live presence view with the relay's full membership list.
///
/// Members missing from the snapshot count as disconnected for the sweeper.
#[utoipa::path(
    put,
    path = "/presence",
    request_body = PresenceSnapshotPayload,
    responses(
        (status = 200, description = "Snapshot applied", body = SnapshotResponse),
        (status = 401, description = "Missing or wrong ingest token")
    )
)]
pub async fn replace_presence_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PresenceSnapshotPayload>,
) -> impl IntoResponse {
    app_state.presence.replace(
        payload
            .members
            .into_iter()
            .map(|member| (UserId::new(member.user_id), ChannelRef::from(member.channel))),
    );
    let present = app_state.presence.len();
    info!(present, "Presence snapshot applied");
    Json(SnapshotResponse { present })
}
