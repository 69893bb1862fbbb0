//! Request validation for watch events and sessions.
//!
//! Checks run in a fixed order and the first failure wins:
//! referer, session token, then the player-state fields in declaration order.

use validator::{Validate, ValidationErrors};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::PlayerState;
use crate::limits::MAX_REFERER_LEN;
use crate::session::{is_valid_session_token, SessionDraft};

/// Player-state fields in check order.
const PLAYER_STATE_FIELDS: [(&str, ValidationErrorCode); 5] = [
    ("video_id", ValidationErrorCode::VideoId),
    ("video_title", ValidationErrorCode::VideoTitle),
    ("current_time", ValidationErrorCode::CurrentTime),
    ("video_state_label", ValidationErrorCode::StateLabel),
    ("video_state_value", ValidationErrorCode::StateValue),
];

const SESSION_DRAFT_FIELDS: [(&str, ValidationErrorCode); 2] = [
    ("video_id", ValidationErrorCode::VideoId),
    ("path", ValidationErrorCode::Path),
];

/// Requires a non-empty referer of at most 255 chars.
pub fn validate_referer(referer: Option<&str>) -> Result<String> {
    match referer {
        Some(value) if !value.trim().is_empty() && value.chars().count() <= MAX_REFERER_LEN => {
            Ok(value.to_string())
        }
        Some(value) if !value.trim().is_empty() => Err(Error::validation(
            ValidationErrorCode::Referer,
            "referer",
            format!("must be at most {} characters", MAX_REFERER_LEN),
        )),
        _ => Err(Error::validation(
            ValidationErrorCode::Referer,
            "referer",
            "header is required",
        )),
    }
}

/// Validates the optional referer on session creation.
pub fn validate_optional_referer(referer: Option<&str>) -> Result<Option<String>> {
    match referer {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => validate_referer(Some(value)).map(Some),
    }
}

/// Validates the optional session token header.
pub fn validate_session_header(token: Option<&str>) -> Result<Option<String>> {
    match token {
        None => Ok(None),
        Some(value) if is_valid_session_token(value) => Ok(Some(value.to_string())),
        Some(_) => Err(Error::validation(
            ValidationErrorCode::SessionToken,
            "x-session-id",
            "must match [A-Za-z0-9_-]+ and be at most 64 characters",
        )),
    }
}

/// Parses a player-state body.
pub fn parse_player_state(body: &[u8]) -> Result<PlayerState> {
    serde_json::from_slice(body).map_err(|e| {
        Error::validation(ValidationErrorCode::InvalidFormat, "body", e.to_string())
    })
}

/// Validates player-state fields, reporting the first failing field.
pub fn validate_player_state(state: &PlayerState) -> Result<()> {
    state
        .validate()
        .map_err(|errors| first_failure(&errors, &PLAYER_STATE_FIELDS))
}

/// Validates a session create/update payload.
pub fn validate_session_draft(draft: &SessionDraft) -> Result<()> {
    if let Some(ref token) = draft.watch_session_id {
        validate_session_header(Some(token.as_str()))?;
    }
    draft
        .validate()
        .map_err(|errors| first_failure(&errors, &SESSION_DRAFT_FIELDS))?;
    if draft.path.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(Error::validation(
            ValidationErrorCode::Path,
            "path",
            "must not be blank",
        ));
    }
    Ok(())
}

/// A fully validated create-event request.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub referer: String,
    pub session_token: Option<String>,
    pub state: PlayerState,
}

/// Runs every create-event check in order.
pub fn validate_ingest(
    referer: Option<&str>,
    session_token: Option<&str>,
    body: &[u8],
) -> Result<IngestRequest> {
    let referer = validate_referer(referer)?;
    let session_token = validate_session_header(session_token)?;
    let state = parse_player_state(body)?;
    validate_player_state(&state)?;
    Ok(IngestRequest {
        referer,
        session_token,
        state,
    })
}

fn first_failure(errors: &ValidationErrors, order: &[(&'static str, ValidationErrorCode)]) -> Error {
    let field_errors = errors.field_errors();
    for (field, code) in order {
        if let Some(list) = field_errors.get(*field) {
            let message = list
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| describe(field));
            return Error::validation(*code, *field, message);
        }
    }
    Error::validation(ValidationErrorCode::InvalidFormat, "body", errors.to_string())
}

fn describe(field: &str) -> String {
    match field {
        "video_id" => "must be 1-32 characters".to_string(),
        "video_title" => "must be 1-255 characters".to_string(),
        "current_time" => "must be >= 0".to_string(),
        "video_state_label" => "must be 1-64 characters".to_string(),
        "video_state_value" => "must be between -1 and 5".to_string(),
        "path" => "must be 1-255 characters".to_string(),
        other => format!("{} is invalid", other),
    }
}
