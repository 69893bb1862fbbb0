//! User statistics reporter.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::logged;
use crate::error::Result;
use crate::stats::{ReportConfig, UserStatsSnapshot};
use crate::store::WatchStore;

pub struct StatsReporter {
    store: Arc<dyn WatchStore>,
    config: ReportConfig,
}

impl StatsReporter {
    pub fn new(store: Arc<dyn WatchStore>, config: ReportConfig) -> Self {
        Self { store, config }
    }

    /// Builds the dashboard snapshot. Sections run concurrently and any
    /// section failure fails the whole report.
    pub async fn report(&self, user_id: Uuid) -> Result<UserStatsSnapshot> {
        let since = self.config.horizon(Utc::now());
        let store = &self.store;

        let sections = tokio::try_join!(
            store.user_totals(user_id),
            store.recent_events(user_id, self.config.recent_limit),
            store.top_videos(user_id, self.config.top_videos_limit),
            store.daily_activity(user_id, since),
            store.hourly_activity(user_id, since),
            store.engagement(
                user_id,
                self.config.engagement_min_events,
                self.config.engagement_limit
            ),
            store.session_summary(user_id),
        );
        let (
            totals,
            recent_events,
            top_videos,
            daily_activity,
            hourly_activity,
            engagement,
            session_summary,
        ) = logged("user_stats", sections)?;

        debug!(user_id = %user_id, total_events = totals.total_events, "User stats computed");

        Ok(UserStatsSnapshot {
            user_id,
            totals,
            recent_events,
            top_videos,
            daily_activity,
            hourly_activity,
            engagement,
            session_summary,
        })
    }
}
