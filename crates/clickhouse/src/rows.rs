//! Row types for ClickHouse reads and writes.
//!
//! Ids are stored as strings and DateTime64(3) columns as epoch millis.

use chrono::{DateTime, NaiveDate, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watch_core::stats::{
    DailyActivity, HourlyActivity, SessionSummary, UserTotals, VideoActivity, VideoEngagement,
};
use watch_core::{AggregateBucket, Error, Result, User, WatchEvent, WatchSession};

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::database(format!("Corrupt id '{}': {}", raw, e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::database(format!("Timestamp out of range: {}", ms)))
}

/// Column list matching `EventRow` field order.
pub const EVENT_COLUMNS: &str = "id, user_id, video_id, video_title, playback_position, \
     video_state_label, video_state_value, referer, watch_session_id, time";

/// Column list matching `SessionRow` field order.
pub const SESSION_COLUMNS: &str =
    "watch_session_id, user_id, video_id, path, referer, last_active";

/// Column list matching `UserRow` field order.
pub const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

/// Row for the watch_events table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub playback_position: f64,
    pub video_state_label: String,
    pub video_state_value: i8,
    pub referer: String,
    pub watch_session_id: Option<String>,
    pub time: i64, // DateTime64(3) as milliseconds
}

impl From<&WatchEvent> for EventRow {
    fn from(event: &WatchEvent) -> Self {
        Self {
            id: event.id.to_string(),
            user_id: event.user_id.to_string(),
            video_id: event.video_id.clone(),
            video_title: event.video_title.clone(),
            playback_position: event.current_time,
            video_state_label: event.video_state_label.clone(),
            // Validated to -1..=5 before it gets here
            video_state_value: event.video_state_value.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            referer: event.referer.clone(),
            watch_session_id: event.watch_session_id.clone(),
            time: event.time.timestamp_millis(),
        }
    }
}

impl TryFrom<EventRow> for WatchEvent {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            user_id: parse_id(&row.user_id)?,
            video_id: row.video_id,
            video_title: row.video_title,
            current_time: row.playback_position,
            video_state_label: row.video_state_label,
            video_state_value: i32::from(row.video_state_value),
            referer: row.referer,
            watch_session_id: row.watch_session_id,
            time: from_millis(row.time)?,
        })
    }
}

/// Row for the watch_sessions table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SessionRow {
    pub watch_session_id: String,
    pub user_id: String,
    pub video_id: Option<String>,
    pub path: Option<String>,
    pub referer: Option<String>,
    pub last_active: i64,
}

impl From<&WatchSession> for SessionRow {
    fn from(session: &WatchSession) -> Self {
        Self {
            watch_session_id: session.watch_session_id.clone(),
            user_id: session.user_id.to_string(),
            video_id: session.video_id.clone(),
            path: session.path.clone(),
            referer: session.referer.clone(),
            last_active: session.last_active.timestamp_millis(),
        }
    }
}

impl TryFrom<SessionRow> for WatchSession {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            watch_session_id: row.watch_session_id,
            user_id: parse_id(&row.user_id)?,
            video_id: row.video_id,
            path: row.path,
            referer: row.referer,
            last_active: from_millis(row.last_active)?,
        })
    }
}

/// Row for the users table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: user.created_at.timestamp_millis(),
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            created_at: from_millis(row.created_at)?,
        })
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct AggregateRow {
    pub bucket_ms: i64,
    pub video_id: String,
    pub total_events: u64,
    pub max_viewership: f64,
    pub avg_viewership: f64,
    pub unique_views: u64,
}

impl TryFrom<AggregateRow> for AggregateBucket {
    type Error = Error;

    fn try_from(row: AggregateRow) -> Result<Self> {
        Ok(Self {
            time: from_millis(row.bucket_ms)?,
            video_id: row.video_id,
            total_events: row.total_events,
            max_viewership: row.max_viewership,
            avg_viewership: row.avg_viewership,
            unique_views: i64::try_from(row.unique_views).unwrap_or(i64::MAX),
        })
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct TotalsRow {
    pub total_events: u64,
    pub unique_videos: u64,
    pub unique_sessions: u64,
    pub total_watch_time: f64,
}

impl From<TotalsRow> for UserTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            total_events: row.total_events,
            unique_videos: row.unique_videos,
            unique_sessions: row.unique_sessions,
            total_watch_time: row.total_watch_time,
        }
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct VideoActivityRow {
    pub video_id: String,
    pub video_title: String,
    pub event_count: u64,
    pub last_watched: i64,
}

impl TryFrom<VideoActivityRow> for VideoActivity {
    type Error = Error;

    fn try_from(row: VideoActivityRow) -> Result<Self> {
        Ok(Self {
            video_id: row.video_id,
            video_title: row.video_title,
            event_count: row.event_count,
            last_watched: from_millis(row.last_watched)?,
        })
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct DailyRow {
    /// `YYYY-MM-DD`
    pub day: String,
    pub event_count: u64,
    pub watch_time: f64,
}

impl TryFrom<DailyRow> for DailyActivity {
    type Error = Error;

    fn try_from(row: DailyRow) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d")
            .map_err(|e| Error::database(format!("Corrupt date '{}': {}", row.day, e)))?;
        Ok(Self {
            date,
            event_count: row.event_count,
            watch_time: row.watch_time,
        })
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct HourlyRow {
    pub day_of_week: u8,
    pub hour: u8,
    pub event_count: u64,
}

impl From<HourlyRow> for HourlyActivity {
    fn from(row: HourlyRow) -> Self {
        Self {
            day_of_week: row.day_of_week,
            hour: row.hour,
            event_count: row.event_count,
        }
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct EngagementRow {
    pub video_id: String,
    pub video_title: String,
    pub event_count: u64,
    pub avg_position: f64,
    pub max_position: f64,
    pub min_position: f64,
}

impl From<EngagementRow> for VideoEngagement {
    fn from(row: EngagementRow) -> Self {
        Self {
            video_id: row.video_id,
            video_title: row.video_title,
            event_count: row.event_count,
            avg_position: row.avg_position,
            max_position: row.max_position,
            min_position: row.min_position,
        }
    }
}

#[derive(Debug, Row, Deserialize)]
pub struct SessionSummaryRow {
    pub session_count: u64,
    pub event_count: u64,
    pub avg_position: f64,
    pub min_position: f64,
    pub max_position: f64,
}

impl From<SessionSummaryRow> for SessionSummary {
    fn from(row: SessionSummaryRow) -> Self {
        if row.event_count == 0 {
            return Self::default();
        }
        Self {
            session_count: row.session_count,
            avg_position: Some(row.avg_position),
            min_position: Some(row.min_position),
            max_position: Some(row.max_position),
        }
    }
}
