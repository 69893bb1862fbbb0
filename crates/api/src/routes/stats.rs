//! Aggregation and user statistics endpoints.
//!
//! Aggregates are public; the per-user report requires a token.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::time::Instant;
use telemetry::metrics;

use watch_core::{AggregateBucket, Result, UserStatsSnapshot, WindowParams};

use crate::extractors::AuthUser;
use crate::response::ApiError;
use crate::state::AppState;

/// Counts and times a read.
fn observed<T>(start: Instant, result: Result<T>) -> std::result::Result<Json<T>, ApiError> {
    metrics().query_latency_ms.observe_since(start);
    match result {
        Ok(value) => {
            metrics().queries_served.inc();
            Ok(Json(value))
        }
        Err(e) => {
            metrics().query_failures.inc();
            Err(e.into())
        }
    }
}

/// GET /api/stats/top?bucket&hours-ago&hours-until
pub async fn top_handler(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> std::result::Result<Json<Vec<AggregateBucket>>, ApiError> {
    let start = Instant::now();
    observed(start, state.services.aggregation.top_stats(&params).await)
}

/// GET /api/stats/videos/:video_id?bucket&hours-ago&hours-until
pub async fn video_handler(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(params): Query<WindowParams>,
) -> std::result::Result<Json<Vec<AggregateBucket>>, ApiError> {
    let start = Instant::now();
    observed(start, state.services.aggregation.video_stats(&video_id, &params).await)
}

/// GET /api/stats/me
pub async fn user_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> std::result::Result<Json<UserStatsSnapshot>, ApiError> {
    let start = Instant::now();
    observed(start, state.services.reporter.report(user.id).await)
}
