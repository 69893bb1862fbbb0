//! In-process watch store.
//!
//! A single lock guards the whole state, so every trait method is one atomic
//! unit of work. Failure switches let tests exercise rollback paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use watch_core::aggregate::{self, AggregateBucket, AggregateQuery};
use watch_core::stats::{
    self, DailyActivity, HourlyActivity, SessionSummary, UserTotals, VideoActivity,
    VideoEngagement,
};
use watch_core::{AccountStore, Error, Page, Result, User, WatchEvent, WatchSession, WatchStore};

#[derive(Default)]
struct State {
    /// Insertion order
    events: Vec<WatchEvent>,
    sessions: HashMap<String, WatchSession>,
    users: HashMap<Uuid, User>,
}

impl State {
    fn user_events(&self, user_id: Uuid) -> Vec<&WatchEvent> {
        self.events.iter().filter(|e| e.user_id == user_id).collect()
    }
}

/// Memory-backed implementation of the store traits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    /// Every operation fails
    should_fail: Arc<AtomicBool>,
    /// Session writes fail, including the touch inside an event insert
    fail_session_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Make session writes fail while leaving reads and event writes working.
    pub fn set_fail_session_writes(&self, fail: bool) {
        self.fail_session_writes.store(fail, Ordering::Relaxed);
    }

    pub fn event_count(&self) -> usize {
        self.state.read().events.len()
    }

    fn check(&self) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::database("memory store failure injected"));
        }
        Ok(())
    }

    fn check_session_write(&self) -> Result<()> {
        self.check()?;
        if self.fail_session_writes.load(Ordering::Relaxed) {
            return Err(Error::database("session write failure injected"));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn insert_event(&self, mut event: WatchEvent, session_token: Option<&str>) -> Result<WatchEvent> {
        self.check()?;
        let mut state = self.state.write();

        let attach = session_token.filter(|token| state.sessions.contains_key(*token));
        event.watch_session_id = attach.map(String::from);
        state.events.push(event.clone());

        if let Some(token) = attach {
            if let Err(e) = self.check_session_write() {
                state.events.pop();
                debug!(event_id = %event.id, "Event insert rolled back");
                return Err(e);
            }
            if let Some(session) = state.sessions.get_mut(token) {
                session.touch(event.time);
            }
        }
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<WatchEvent>> {
        self.check()?;
        Ok(self.state.read().events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self, user_id: Uuid, page: Page) -> Result<Vec<WatchEvent>> {
        self.check()?;
        let state = self.state.read();
        Ok(state
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn update_event(&self, event: &WatchEvent) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        match state.events.iter_mut().find(|e| e.id == event.id) {
            Some(stored) => {
                stored.apply(event.player_state());
                Ok(())
            }
            None => Err(Error::not_found("Watch event")),
        }
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut state = self.state.write();
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        Ok(state.events.len() < before)
    }

    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        self.check_session_write()?;
        match self.state.write().sessions.get_mut(token) {
            Some(session) => {
                session.touch(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_session(&self, token: &str) -> Result<Option<WatchSession>> {
        self.check()?;
        Ok(self.state.read().sessions.get(token).cloned())
    }

    async fn create_session(&self, session: WatchSession) -> Result<WatchSession> {
        self.check_session_write()?;
        let mut state = self.state.write();
        if state.sessions.contains_key(&session.watch_session_id) {
            return Err(Error::conflict(format!(
                "session '{}' already exists",
                session.watch_session_id
            )));
        }
        state
            .sessions
            .insert(session.watch_session_id.clone(), session.clone());
        Ok(session)
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<WatchSession>> {
        self.check()?;
        let mut sessions: Vec<WatchSession> = self
            .state
            .read()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then_with(|| a.watch_session_id.cmp(&b.watch_session_id))
        });
        Ok(sessions)
    }

    async fn update_session(&self, session: &WatchSession) -> Result<()> {
        self.check_session_write()?;
        let mut state = self.state.write();
        match state.sessions.get_mut(&session.watch_session_id) {
            Some(stored) => {
                stored.video_id = session.video_id.clone();
                stored.path = session.path.clone();
                Ok(())
            }
            None => Err(Error::not_found("Watch session")),
        }
    }

    async fn delete_session(&self, token: &str) -> Result<bool> {
        self.check_session_write()?;
        Ok(self.state.write().sessions.remove(token).is_some())
    }

    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateBucket>> {
        self.check()?;
        let state = self.state.read();
        Ok(aggregate::aggregate(&state.events, query))
    }

    async fn user_totals(&self, user_id: Uuid) -> Result<UserTotals> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::totals(&state.user_events(user_id)))
    }

    async fn recent_events(&self, user_id: Uuid, limit: usize) -> Result<Vec<WatchEvent>> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::recent_events(&state.user_events(user_id), limit))
    }

    async fn top_videos(&self, user_id: Uuid, limit: usize) -> Result<Vec<VideoActivity>> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::top_videos(&state.user_events(user_id), limit))
    }

    async fn daily_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DailyActivity>> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::daily_activity(&state.user_events(user_id), since))
    }

    async fn hourly_activity(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<HourlyActivity>> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::hourly_activity(&state.user_events(user_id), since))
    }

    async fn engagement(&self, user_id: Uuid, min_events: u64, limit: usize) -> Result<Vec<VideoEngagement>> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::engagement(&state.user_events(user_id), min_events, limit))
    }

    async fn session_summary(&self, user_id: Uuid) -> Result<SessionSummary> {
        self.check()?;
        let state = self.state.read();
        Ok(stats::session_summary(&state.user_events(user_id)))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        self.check()?;
        let mut state = self.state.write();
        let taken = state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(Error::conflict("Username or email already registered"));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.check()?;
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}
