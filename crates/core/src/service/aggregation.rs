//! Aggregation engine.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::logged;
use crate::aggregate::{AggregateBucket, AggregateQuery, AggregateScope, WindowParams};
use crate::bucket::BucketWidth;
use crate::config::AggregationConfig;
use crate::error::Result;
use crate::store::WatchStore;

pub struct AggregationEngine {
    store: Arc<dyn WatchStore>,
    config: AggregationConfig,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn WatchStore>, config: AggregationConfig) -> Self {
        Self { store, config }
    }

    /// Buckets across all videos, ranked by distinct sessions.
    pub async fn top_stats(&self, params: &WindowParams) -> Result<Vec<AggregateBucket>> {
        let query = self.resolve(AggregateScope::Top, params, self.config.top_hours_ago)?;
        self.run(query).await
    }

    /// Buckets for a single video.
    pub async fn video_stats(&self, video_id: &str, params: &WindowParams) -> Result<Vec<AggregateBucket>> {
        let query = self.resolve(
            AggregateScope::Video(video_id.to_string()),
            params,
            self.config.video_hours_ago,
        )?;
        self.run(query).await
    }

    fn resolve(
        &self,
        scope: AggregateScope,
        params: &WindowParams,
        default_hours_ago: i64,
    ) -> Result<AggregateQuery> {
        let bucket = BucketWidth::parse_or_default(params.bucket.as_deref())?;
        let window = params.window(Utc::now(), default_hours_ago);
        Ok(AggregateQuery {
            scope,
            bucket,
            window,
        })
    }

    async fn run(&self, query: AggregateQuery) -> Result<Vec<AggregateBucket>> {
        if query.window.is_empty() {
            return Ok(Vec::new());
        }
        let buckets = logged("aggregate", self.store.aggregate(&query).await)?;
        debug!(
            scope = ?query.scope,
            bucket = %query.bucket,
            start = %query.window.start,
            end = %query.window.end,
            rows = buckets.len(),
            "Aggregation complete"
        );
        Ok(buckets)
    }
}
