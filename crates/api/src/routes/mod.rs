//! API routes.

pub mod auth;
pub mod events;
pub mod health;
pub mod sessions;
pub mod stats;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::state::AppState;

/// Builds the CORS layer. `*` (or an empty list) allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Creates the API router.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/video-events",
            post(events::create_handler).get(events::list_handler),
        )
        .route(
            "/video-events/:event_id",
            get(events::get_handler)
                .put(events::update_handler)
                .delete(events::delete_handler),
        )
        .route("/stats/top", get(stats::top_handler))
        .route("/stats/videos/:video_id", get(stats::video_handler))
        .route("/stats/me", get(stats::user_handler))
        .route(
            "/watch-sessions",
            post(sessions::create_handler).get(sessions::list_handler),
        )
        .route(
            "/watch-sessions/:watch_session_id",
            get(sessions::get_handler)
                .put(sessions::update_handler)
                .delete(sessions::delete_handler),
        );

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/health/metrics", get(health::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
