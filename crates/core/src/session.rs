//! Watch session types.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;
use validator::Validate;

use crate::events::not_blank;
use crate::limits::MAX_SESSION_TOKEN_LEN;

static SESSION_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid session token regex"));

/// Returns true if `token` is a well-formed session token.
pub fn is_valid_session_token(token: &str) -> bool {
    !token.is_empty()
        && token.chars().count() <= MAX_SESSION_TOKEN_LEN
        && SESSION_TOKEN_PATTERN.is_match(token)
}

/// Groups events from one continuous viewing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSession {
    pub watch_session_id: String,
    pub user_id: Uuid,
    pub video_id: Option<String>,
    pub path: Option<String>,
    pub referer: Option<String>,
    pub last_active: DateTime<Utc>,
}

impl WatchSession {
    /// Advances `last_active`, never moving it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_active {
            self.last_active = at;
        }
    }
}

/// Client payload for creating or updating a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SessionDraft {
    /// Client-chosen token; a UUID is generated when absent
    #[serde(default)]
    pub watch_session_id: Option<String>,
    #[validate(length(min = 1, max = 32), custom(function = "not_blank"))]
    pub video_id: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub path: Option<String>,
}

impl SessionDraft {
    /// Builds the stored session for `user_id`.
    pub fn into_session(self, user_id: Uuid, referer: Option<String>, now: DateTime<Utc>) -> WatchSession {
        WatchSession {
            watch_session_id: self
                .watch_session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id,
            video_id: Some(self.video_id),
            path: self.path,
            referer,
            last_active: now,
        }
    }
}
