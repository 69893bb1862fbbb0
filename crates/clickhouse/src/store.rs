//! `WatchStore` and `AccountStore` over ClickHouse.
//!
//! ClickHouse has no multi-statement transactions. An event insert that
//! attaches a session writes the event row first, then the new session
//! version; if the second write fails the event row is deleted again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use watch_core::aggregate::{AggregateBucket, AggregateQuery, AggregateScope};
use watch_core::limits::CUED_LABEL;
use watch_core::stats::{
    DailyActivity, HourlyActivity, SessionSummary, UserTotals, VideoActivity, VideoEngagement,
};
use watch_core::{AccountStore, Error, Page, Result, User, WatchEvent, WatchSession, WatchStore};

use crate::client::ClickHouseClient;
use crate::rows::{
    AggregateRow, DailyRow, EngagementRow, EventRow, HourlyRow, SessionRow, SessionSummaryRow,
    TotalsRow, UserRow, VideoActivityRow, EVENT_COLUMNS, SESSION_COLUMNS, USER_COLUMNS,
};
use crate::schema::bucket_expr;

fn query_error(e: clickhouse::error::Error) -> Error {
    Error::database(format!("Query error: {}", e))
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// ClickHouse-backed store.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn write_row<T: Row + Serialize>(&self, table: &str, row: &T) -> Result<()> {
        let start = Instant::now();
        let mut insert = self
            .client
            .inner()
            .insert(table)
            .map_err(|e| Error::database(format!("Insert error: {}", e)))?;
        insert
            .write(row)
            .await
            .map_err(|e| Error::database(format!("Write error: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::database(format!("End error: {}", e)))?;

        debug!(table, latency_ms = %start.elapsed().as_millis(), "Inserted row to ClickHouse");
        Ok(())
    }

    async fn remove_event_row(&self, id: Uuid) -> Result<()> {
        self.client
            .inner()
            .query("DELETE FROM watch_events WHERE id = ?")
            .bind(id.to_string())
            .execute()
            .await
            .map_err(query_error)
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<WatchSession>> {
        let row = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM watch_sessions FINAL WHERE watch_session_id = ? LIMIT 1",
                SESSION_COLUMNS
            ))
            .bind(token)
            .fetch_optional::<SessionRow>()
            .await
            .map_err(query_error)?;
        row.map(WatchSession::try_from).transpose()
    }

    async fn user_where(&self, predicate: &str, value: &str) -> Result<Option<User>> {
        let row = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM users FINAL WHERE {} = ? LIMIT 1",
                USER_COLUMNS, predicate
            ))
            .bind(value)
            .fetch_optional::<UserRow>()
            .await
            .map_err(query_error)?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl WatchStore for ClickHouseStore {
    fn backend(&self) -> &'static str {
        "clickhouse"
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .inner()
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map(|_| ())
            .map_err(query_error)
    }

    async fn insert_event(&self, mut event: WatchEvent, session_token: Option<&str>) -> Result<WatchEvent> {
        let session = match session_token {
            Some(token) => self.session_by_token(token).await?,
            None => None,
        };
        event.watch_session_id = session.as_ref().map(|s| s.watch_session_id.clone());

        self.write_row("watch_events", &EventRow::from(&event)).await?;

        if let Some(mut session) = session {
            session.touch(event.time);
            if let Err(e) = self.write_row("watch_sessions", &SessionRow::from(&session)).await {
                warn!(event_id = %event.id, error = %e, "Session touch failed, removing event");
                if let Err(undo) = self.remove_event_row(event.id).await {
                    error!(event_id = %event.id, error = %undo, "Failed to remove orphaned event");
                }
                return Err(e);
            }
        }
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<WatchEvent>> {
        let row = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM watch_events WHERE id = ? LIMIT 1",
                EVENT_COLUMNS
            ))
            .bind(id.to_string())
            .fetch_optional::<EventRow>()
            .await
            .map_err(query_error)?;
        row.map(WatchEvent::try_from).transpose()
    }

    async fn list_events(&self, user_id: Uuid, page: Page) -> Result<Vec<WatchEvent>> {
        let rows = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM watch_events WHERE user_id = ? ORDER BY time ASC, id ASC LIMIT ? OFFSET ?",
                EVENT_COLUMNS
            ))
            .bind(user_id.to_string())
            .bind(page.limit as u64)
            .bind(page.offset as u64)
            .fetch_all::<EventRow>()
            .await
            .map_err(query_error)?;
        collect(rows)
    }

    async fn update_event(&self, event: &WatchEvent) -> Result<()> {
        let row = EventRow::from(event);
        self.client
            .inner()
            .query(
                "ALTER TABLE watch_events UPDATE video_id = ?, video_title = ?, playback_position = ?, \
                 video_state_label = ?, video_state_value = ? WHERE id = ? \
                 SETTINGS mutations_sync = 1",
            )
            .bind(row.video_id)
            .bind(row.video_title)
            .bind(row.playback_position)
            .bind(row.video_state_label)
            .bind(row.video_state_value)
            .bind(row.id)
            .execute()
            .await
            .map_err(query_error)
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        if self.get_event(id).await?.is_none() {
            return Ok(false);
        }
        self.remove_event_row(id).await?;
        Ok(true)
    }

    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        match self.session_by_token(token).await? {
            Some(mut session) => {
                session.touch(at);
                self.write_row("watch_sessions", &SessionRow::from(&session)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_session(&self, token: &str) -> Result<Option<WatchSession>> {
        self.session_by_token(token).await
    }

    async fn create_session(&self, session: WatchSession) -> Result<WatchSession> {
        if self.session_by_token(&session.watch_session_id).await?.is_some() {
            return Err(Error::conflict(format!(
                "session '{}' already exists",
                session.watch_session_id
            )));
        }
        self.write_row("watch_sessions", &SessionRow::from(&session)).await?;
        Ok(session)
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<WatchSession>> {
        let rows = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM watch_sessions FINAL WHERE user_id = ? \
                 ORDER BY last_active DESC, watch_session_id ASC",
                SESSION_COLUMNS
            ))
            .bind(user_id.to_string())
            .fetch_all::<SessionRow>()
            .await
            .map_err(query_error)?;
        collect(rows)
    }

    async fn update_session(&self, session: &WatchSession) -> Result<()> {
        let Some(mut stored) = self.session_by_token(&session.watch_session_id).await? else {
            return Err(Error::not_found("Watch session"));
        };
        stored.video_id = session.video_id.clone();
        stored.path = session.path.clone();
        self.write_row("watch_sessions", &SessionRow::from(&stored)).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool> {
        if self.session_by_token(token).await?.is_none() {
            return Ok(false);
        }
        self.client
            .inner()
            .query("DELETE FROM watch_sessions WHERE watch_session_id = ?")
            .bind(token)
            .execute()
            .await
            .map_err(query_error)?;
        Ok(true)
    }

    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateBucket>> {
        let (video_filter, order) = match query.scope {
            AggregateScope::Top => (
                "",
                "bucket_ms DESC, unique_views DESC, video_id ASC",
            ),
            AggregateScope::Video(_) => ("AND video_id = ?", "bucket_ms DESC, video_id ASC"),
        };
        let sql = format!(
            "SELECT {bucket} AS bucket_ms, video_id, count() AS total_events, \
             max(playback_position) AS max_viewership, avg(playback_position) AS avg_viewership, \
             uniqExact(watch_session_id) AS unique_views \
             FROM watch_events \
             WHERE time > fromUnixTimestamp64Milli(toInt64(?)) \
             AND time <= fromUnixTimestamp64Milli(toInt64(?)) \
             AND video_state_label != '{cued}' {video_filter} \
             GROUP BY bucket_ms, video_id ORDER BY {order}",
            bucket = bucket_expr(&query.bucket),
            cued = CUED_LABEL,
            video_filter = video_filter,
            order = order,
        );

        let mut q = self
            .client
            .inner()
            .query(&sql)
            .bind(query.window.start.timestamp_millis())
            .bind(query.window.end.timestamp_millis());
        if let AggregateScope::Video(ref video_id) = query.scope {
            q = q.bind(video_id.as_str());
        }
        let rows = q.fetch_all::<AggregateRow>().await.map_err(query_error)?;
        collect(rows)
    }

    async fn user_totals(&self, user_id: Uuid) -> Result<UserTotals> {
        self.client
            .inner()
            .query(
                "SELECT count() AS total_events, uniqExact(video_id) AS unique_videos, \
                 uniqExact(watch_session_id) AS unique_sessions, \
                 sum(playback_position) AS total_watch_time \
                 FROM watch_events WHERE user_id = ?",
            )
            .bind(user_id.to_string())
            .fetch_one::<TotalsRow>()
            .await
            .map(UserTotals::from)
            .map_err(query_error)
    }

    async fn recent_events(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchEvent>> {
        let rows = self
            .client
            .inner()
            .query(&format!(
                "SELECT {} FROM watch_events WHERE user_id = ? ORDER BY time DESC, id ASC LIMIT ?",
                EVENT_COLUMNS
            ))
            .bind(user_id.to_string())
            .bind(limit as u64)
            .fetch_all::<EventRow>()
            .await
            .map_err(query_error)?;
        collect(rows)
    }

    async fn top_videos(&self, user_id: Uuid, limit: usize) -> Result<Vec<VideoActivity>> {
        let rows = self
            .client
            .inner()
            .query(
                "SELECT video_id, argMax(video_title, time) AS video_title, count() AS event_count, \
                 toInt64(toUnixTimestamp64Milli(max(time))) AS last_watched \
                 FROM watch_events WHERE user_id = ? \
                 GROUP BY video_id ORDER BY event_count DESC, video_id ASC LIMIT ?",
            )
            .bind(user_id.to_string())
            .bind(limit as u64)
            .fetch_all::<VideoActivityRow>()
            .await
            .map_err(query_error)?;
        collect(rows)
    }

    async fn daily_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DailyActivity>> {
        let rows = self
            .client
            .inner()
            .query(
                "SELECT toString(toDate(time)) AS day, count() AS event_count, \
                 sum(playback_position) AS watch_time \
                 FROM watch_events \
                 WHERE user_id = ? AND time >= fromUnixTimestamp64Milli(toInt64(?)) \
                 GROUP BY day ORDER BY day ASC",
            )
            .bind(user_id.to_string())
            .bind(since.timestamp_millis())
            .fetch_all::<DailyRow>()
            .await
            .map_err(query_error)?;
        collect(rows)
    }

    async fn hourly_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<HourlyActivity>> {
        let rows = self
            .client
            .inner()
            .query(
                "SELECT toUInt8(toDayOfWeek(time) % 7) AS day_of_week, toUInt8(toHour(time)) AS hour, \
                 count() AS event_count \
                 FROM watch_events \
                 WHERE user_id = ? AND time >= fromUnixTimestamp64Milli(toInt64(?)) \
                 GROUP BY day_of_week, hour ORDER BY day_of_week ASC, hour ASC",
            )
            .bind(user_id.to_string())
            .bind(since.timestamp_millis())
            .fetch_all::<HourlyRow>()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(HourlyActivity::from).collect())
    }

    async fn engagement(&self, user_id: Uuid, min_events: u64, limit: usize) -> Result<Vec<VideoEngagement>> {
        let rows = self
            .client
            .inner()
            .query(
                "SELECT video_id, argMax(video_title, time) AS video_title, count() AS event_count, \
                 avg(playback_position) AS avg_position, max(playback_position) AS max_position, \
                 min(playback_position) AS min_position \
                 FROM watch_events WHERE user_id = ? \
                 GROUP BY video_id HAVING event_count >= ? \
                 ORDER BY event_count DESC, video_id ASC LIMIT ?",
            )
            .bind(user_id.to_string())
            .bind(min_events)
            .bind(limit as u64)
            .fetch_all::<EngagementRow>()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(VideoEngagement::from).collect())
    }

    async fn session_summary(&self, user_id: Uuid) -> Result<SessionSummary> {
        self.client
            .inner()
            .query(
                "SELECT uniqExact(watch_session_id) AS session_count, count() AS event_count, \
                 avg(playback_position) AS avg_position, min(playback_position) AS min_position, \
                 max(playback_position) AS max_position \
                 FROM watch_events WHERE user_id = ?",
            )
            .bind(user_id.to_string())
            .fetch_one::<SessionSummaryRow>()
            .await
            .map(SessionSummary::from)
            .map_err(query_error)
    }
}

#[async_trait]
impl AccountStore for ClickHouseStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let taken: u64 = self
            .client
            .inner()
            .query("SELECT count() FROM users FINAL WHERE username = ? OR email = ?")
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .fetch_one()
            .await
            .map_err(query_error)?;
        if taken > 0 {
            return Err(Error::conflict("Username or email already registered"));
        }
        self.write_row("users", &UserRow::from(&user)).await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.user_where("id", &id.to_string()).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_where("username", username).await
    }
}
