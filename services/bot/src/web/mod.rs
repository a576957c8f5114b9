pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use middleware::require_ingest_token;
pub use rest::{health_handler, ingest_event_handler, replace_presence_handler};

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the complete HTTP application.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler));

    // Ingestion routes (shared secret when configured)
    let ingest_routes = Router::new()
        .route("/events", post(ingest_event_handler))
        .route("/presence", put(replace_presence_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_ingest_token,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(ingest_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LivePresence;
    use crate::config::Config;
    use attendance_core::{PresenceEvent, PresenceView, UserId};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> (Router, mpsc::Receiver<PresenceEvent>, Arc<LivePresence>) {
        let token = token.map(str::to_string);
        let config = Config::from_source(move |key| match key {
            "SLACK_BOT_TOKEN" => Some("xoxb-test".to_string()),
            "SLACK_CHANNEL_ID" => Some("C1".to_string()),
            "DAILY_REPORT_CHANNEL_ID" => Some("C2".to_string()),
            "INGEST_TOKEN" => token.clone(),
            _ => None,
        })
        .unwrap();
        let (events, rx) = mpsc::channel(4);
        let presence = Arc::new(LivePresence::new());
        let state = Arc::new(AppState {
            config: Arc::new(config),
            events,
            presence: presence.clone(),
        });
        (router(state), rx, presence)
    }

    fn post_event(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/events")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(
                r#"{"user_id":"1","display_name":"Alice","after":{"id":"9","name":"office"}}"#,
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (app, _rx, _) = app(Some("secret"));
        for path in ["/", "/health"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn events_are_queued() {
        let (app, mut rx, _) = app(None);

        let response = app.oneshot(post_event(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, UserId::new("1"));
        assert!(event.before.is_none());
    }

    #[tokio::test]
    async fn wrong_or_missing_token_is_rejected() {
        let (app, mut rx, _) = app(Some("secret"));

        let missing = app.clone().oneshot(post_event(None)).await.unwrap();
        let wrong = app
            .clone()
            .oneshot(post_event(Some("Bearer nope")))
            .await
            .unwrap();
        let right = app
            .oneshot(post_event(Some("Bearer secret")))
            .await
            .unwrap();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(right.status(), StatusCode::ACCEPTED);
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_answers_503() {
        let (app, _rx, _) = app(None);
        for _ in 0..4 {
            let ok = app.clone().oneshot(post_event(None)).await.unwrap();
            assert_eq!(ok.status(), StatusCode::ACCEPTED);
        }

        let full = app.oneshot(post_event(None)).await.unwrap();
        assert_eq!(full.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn presence_snapshot_replaces_the_view() {
        let (app, _rx, presence) = app(None);
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/presence")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"members":[{"user_id":"7","channel":{"id":"9","name":"office"}}]}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(presence.is_present(&UserId::new("7")));
        assert!(!presence.is_present(&UserId::new("1")));
    }
}
