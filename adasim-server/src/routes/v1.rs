use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{ingest::ingest_run_handler, stream::stream_video_handler},
    middleware::identity::require_identity,
    websocket::events_ws_handler,
};

/// Create all v1 API routes.
///
/// Every route requires a caller identity installed by the auth
/// collaborator in front of this service.
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/runs/{id}/ingest", post(ingest_run_handler))
        .route("/runs/{id}/video", get(stream_video_handler))
        .route("/events/ws", get(events_ws_handler))
        .layer(middleware::from_fn(require_identity))
}
