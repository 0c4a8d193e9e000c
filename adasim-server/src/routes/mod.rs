pub mod v1;

use axum::{
    Json, Router,
    http::{HeaderName, Method, StatusCode, header},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;
use crate::middleware::identity::{USER_ID_HEADER, USER_ROLE_HEADER};

/// Create the versioned API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", v1::create_v1_router())
}

/// Assemble the full application: routes plus CORS and tracing layers.
///
/// Range headers are exposed so browser players can drive seeking.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::RANGE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ])
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ]);

    create_api_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
