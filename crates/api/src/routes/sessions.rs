//! Watch session endpoints. All are scoped to the caller.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};

use watch_core::{SessionDraft, WatchSession};

use crate::extractors::{json_body, AuthUser, WatchHeaders};
use crate::response::{ApiError, DeletedResponse};
use crate::state::AppState;

/// POST /api/watch-sessions
pub async fn create_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: WatchHeaders,
    body: Bytes,
) -> Result<Json<WatchSession>, ApiError> {
    let draft: SessionDraft = json_body(&body)?;
    let session = state
        .services
        .sessions
        .create(user.id, headers.referer.as_deref(), draft)
        .await?;
    Ok(Json(session))
}

/// GET /api/watch-sessions
pub async fn list_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<WatchSession>>, ApiError> {
    Ok(Json(state.services.sessions.list(user.id).await?))
}

/// GET /api/watch-sessions/:watch_session_id
pub async fn get_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(token): Path<String>,
) -> Result<Json<WatchSession>, ApiError> {
    Ok(Json(state.services.sessions.get(user.id, &token).await?))
}

/// PUT /api/watch-sessions/:watch_session_id
pub async fn update_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Json<WatchSession>, ApiError> {
    let draft: SessionDraft = json_body(&body)?;
    let session = state.services.sessions.update(user.id, &token, draft).await?;
    Ok(Json(session))
}

/// DELETE /api/watch-sessions/:watch_session_id
pub async fn delete_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(token): Path<String>,
) -> Result<Json<DeletedResponse<String>>, ApiError> {
    state.services.sessions.delete(user.id, &token).await?;
    Ok(Json(DeletedResponse::session(token)))
}
