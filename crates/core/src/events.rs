//! Watch event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::limits::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Rejects strings that are empty once trimmed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Player state reported by the client on every state change.
///
/// This is both the create and update payload. Any `referer` or
/// `watch_session_id` in the JSON body is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlayerState {
    #[validate(length(min = 1, max = 32), custom(function = "not_blank"))]
    pub video_id: String,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub video_title: String,
    /// Playback position in seconds
    #[validate(range(min = 0.0))]
    pub current_time: f64,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub video_state_label: String,
    #[validate(range(min = -1, max = 5))]
    pub video_state_value: i32,
}

/// One immutable record of a player state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: String,
    pub video_title: String,
    pub current_time: f64,
    pub video_state_label: String,
    pub video_state_value: i32,
    /// Taken from the request header, never from the body
    pub referer: String,
    pub watch_session_id: Option<String>,
    /// Server-assigned at insert
    pub time: DateTime<Utc>,
}

impl WatchEvent {
    /// Creates an event stamped with the given write time.
    pub fn new(user_id: Uuid, referer: String, state: PlayerState, time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            video_id: state.video_id,
            video_title: state.video_title,
            current_time: state.current_time,
            video_state_label: state.video_state_label,
            video_state_value: state.video_state_value,
            referer,
            watch_session_id: None,
            time,
        }
    }

    /// Rewrites the player-state fields only.
    pub fn apply(&mut self, state: PlayerState) {
        self.video_id = state.video_id;
        self.video_title = state.video_title;
        self.current_time = state.current_time;
        self.video_state_label = state.video_state_label;
        self.video_state_value = state.video_state_value;
    }

    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            video_id: self.video_id.clone(),
            video_title: self.video_title.clone(),
            current_time: self.current_time,
            video_state_label: self.video_state_label.clone(),
            video_state_value: self.video_state_value,
        }
    }
}

/// Raw listing parameters as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Normalized listing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Clamps limit to `1..=1000` (default 100) and offset to `>= 0`.
    pub fn from_params(params: &PageParams) -> Self {
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        Self {
            limit: limit as usize,
            offset: offset as usize,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::from_params(&PageParams::default())
    }
}
