//! ClickHouse table schemas and SQL fragments.
//!
//! - Table names are unqualified; the client is bound to the database
//! - DateTime64(3, 'UTC') for millisecond precision
//! - Sessions and users are versioned rows read with FINAL

use watch_core::bucket::{BucketUnit, BucketWidth};
use watch_core::{Error, Result};

/// Monday 1970-01-05 as seconds since the epoch.
const MONDAY_EPOCH_SECS: i64 = 4 * 86_400;

/// SQL for creating the watch events table.
///
/// `playback_position` holds the player's `current_time`, which is a
/// function name in ClickHouse.
pub const CREATE_WATCH_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS watch_events (
    id String,
    user_id String,
    video_id String,
    video_title String,
    playback_position Float64,
    video_state_label LowCardinality(String),
    video_state_value Int8,
    referer String,
    watch_session_id Nullable(String),
    time DateTime64(3, 'UTC')
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(time)
ORDER BY (user_id, time, id)
TTL toDateTime(time) + INTERVAL 1 YEAR
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the watch sessions table.
///
/// Every touch writes a new version; the highest `last_active` wins.
pub const CREATE_WATCH_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS watch_sessions (
    watch_session_id String,
    user_id String,
    video_id Nullable(String),
    path Nullable(String),
    referer Nullable(String),
    last_active DateTime64(3, 'UTC')
)
ENGINE = ReplacingMergeTree(last_active)
ORDER BY watch_session_id
TTL toDateTime(last_active) + INTERVAL 3 YEAR
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the users table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id String,
    username String,
    email String,
    password_hash String,
    created_at DateTime64(3, 'UTC')
)
ENGINE = ReplacingMergeTree()
ORDER BY id
SETTINGS index_granularity = 8192
"#;

/// All table creation statements.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_WATCH_EVENTS_TABLE,
        CREATE_WATCH_SESSIONS_TABLE,
        CREATE_USERS_TABLE,
    ]
}

/// Accepts only plain identifiers, since the name is spliced into DDL.
pub fn database_ident(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(Error::internal(format!("invalid ClickHouse database name '{}'", name)))
    }
}

pub fn create_database(name: &str) -> Result<String> {
    Ok(format!("CREATE DATABASE IF NOT EXISTS {}", database_ident(name)?))
}

/// Bucket start of `time` in epoch milliseconds.
///
/// Mirrors `BucketWidth::align`: fixed units are aligned to the epoch,
/// weeks to Monday 1970-01-05, months and years to January 1970.
pub fn bucket_expr(width: &BucketWidth) -> String {
    let amount = i64::from(width.amount);
    let secs = match width.unit {
        BucketUnit::Week => {
            let w = amount * 7 * 86_400;
            format!(
                "intDiv(toUnixTimestamp(time) - {m}, {w}) * {w} + {m}",
                m = MONDAY_EPOCH_SECS,
                w = w
            )
        }
        BucketUnit::Month => format!(
            "toUnixTimestamp(addMonths(toDateTime('1970-01-01 00:00:00', 'UTC'), \
             intDiv((toYear(time) - 1970) * 12 + toMonth(time) - 1, {n}) * {n}))",
            n = amount
        ),
        BucketUnit::Year => format!(
            "toUnixTimestamp(addYears(toDateTime('1970-01-01 00:00:00', 'UTC'), \
             intDiv(toYear(time) - 1970, {n}) * {n}))",
            n = amount
        ),
        _ => {
            let w = width.width_secs().unwrap_or(86_400);
            format!("intDiv(toUnixTimestamp(time), {w}) * {w}", w = w)
        }
    };
    format!("toInt64({}) * 1000", secs)
}
