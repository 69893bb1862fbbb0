//! Storage traits implemented by each backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::account::User;
use crate::aggregate::{AggregateBucket, AggregateQuery};
use crate::error::Result;
use crate::events::{Page, WatchEvent};
use crate::session::WatchSession;
use crate::stats::{
    DailyActivity, HourlyActivity, SessionSummary, UserTotals, VideoActivity, VideoEngagement,
};

/// Durable store for watch events and sessions.
///
/// Every method is a single unit of work. Lookups by id are not
/// owner-scoped; ownership is enforced by the services.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Inserts `event`. If `session_token` names an existing session, the
    /// event is attached to it and the session's `last_active` advances to
    /// the event time, all-or-nothing with the insert.
    async fn insert_event(&self, event: WatchEvent, session_token: Option<&str>) -> Result<WatchEvent>;

    async fn get_event(&self, id: Uuid) -> Result<Option<WatchEvent>>;

    /// The user's events in insertion-time order.
    async fn list_events(&self, user_id: Uuid, page: Page) -> Result<Vec<WatchEvent>>;

    /// Rewrites the player-state fields of the stored event with `event.id`.
    async fn update_event(&self, event: &WatchEvent) -> Result<()>;

    async fn delete_event(&self, id: Uuid) -> Result<bool>;

    /// Advances `last_active` to `max(last_active, at)`. Returns false for unknown tokens.
    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> Result<bool>;

    async fn get_session(&self, token: &str) -> Result<Option<WatchSession>>;

    /// Fails with a conflict if the token already exists.
    async fn create_session(&self, session: WatchSession) -> Result<WatchSession>;

    /// The user's sessions, most recently active first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<WatchSession>>;

    async fn update_session(&self, session: &WatchSession) -> Result<()>;

    async fn delete_session(&self, token: &str) -> Result<bool>;

    /// Bucketed statistics, ordered as the query's scope requires.
    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateBucket>>;

    async fn user_totals(&self, user_id: Uuid) -> Result<UserTotals>;

    async fn recent_events(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchEvent>>;

    async fn top_videos(&self, user_id: Uuid, limit: usize) -> Result<Vec<VideoActivity>>;

    async fn daily_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DailyActivity>>;

    async fn hourly_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<HourlyActivity>>;

    async fn engagement(&self, user_id: Uuid, min_events: u64, limit: usize) -> Result<Vec<VideoEngagement>>;

    async fn session_summary(&self, user_id: Uuid) -> Result<SessionSummary>;
}

/// Durable store for user accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with a conflict if the username or email is taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
}
