//! Watch event endpoints.
//!
//! The referer is always taken from the request header; any `referer` or
//! `watch_session_id` in the JSON body is ignored.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::time::Instant;
use telemetry::metrics;
use tracing::warn;

use watch_core::{Error, Page, PageParams, WatchEvent};

use crate::extractors::{event_id, AuthUser, WatchHeaders};
use crate::response::{ApiError, DeletedResponse};
use crate::state::AppState;

fn is_rejection(err: &Error) -> bool {
    matches!(err, Error::Validation { .. } | Error::Serialization(_))
}

/// POST /api/video-events
pub async fn create_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: WatchHeaders,
    body: Bytes,
) -> Result<(StatusCode, Json<WatchEvent>), ApiError> {
    let start = Instant::now();

    let result = state
        .services
        .ingestor
        .ingest(
            user.id,
            headers.referer.as_deref(),
            headers.session_token.as_deref(),
            &body,
        )
        .await;

    match result {
        Ok(event) => {
            metrics().events_ingested.inc();
            metrics().ingest_latency_ms.observe_since(start);
            Ok((StatusCode::CREATED, Json(event)))
        }
        Err(e) if is_rejection(&e) => {
            metrics().events_rejected.inc();
            warn!(user_id = %user.id, code = e.error_code(), error = %e, "Watch event rejected");
            Err(e.into())
        }
        Err(e) => {
            metrics().ingest_failures.inc();
            Err(e.into())
        }
    }
}

/// GET /api/video-events?limit&offset
pub async fn list_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<WatchEvent>>, ApiError> {
    let events = state
        .services
        .events
        .list(user.id, Page::from_params(&params))
        .await?;
    Ok(Json(events))
}

/// GET /api/video-events/:event_id
pub async fn get_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<WatchEvent>, ApiError> {
    let event = state.services.events.get(user.id, event_id(&raw_id)?).await?;
    Ok(Json(event))
}

/// PUT /api/video-events/:event_id
pub async fn update_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<WatchEvent>, ApiError> {
    let id = event_id(&raw_id)?;
    let event = state.services.events.update(user.id, id, &body).await.map_err(|e| {
        if is_rejection(&e) {
            warn!(user_id = %user.id, event_id = %id, code = e.error_code(), "Watch event update rejected");
        }
        ApiError::from(e)
    })?;
    Ok(Json(event))
}

/// DELETE /api/video-events/:event_id
pub async fn delete_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<DeletedResponse<uuid::Uuid>>, ApiError> {
    let id = event_id(&raw_id)?;
    state.services.events.delete(user.id, id).await?;
    Ok(Json(DeletedResponse::event(id)))
}
