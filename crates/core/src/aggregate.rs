//! Time-bucketed aggregation over watch events.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::bucket::BucketWidth;
use crate::events::WatchEvent;
use crate::limits::{CUED_LABEL, DEFAULT_HOURS_UNTIL};

/// Sentinel for a statistic with no data.
pub const NO_DATA: i64 = -1;

fn no_data_i64() -> i64 {
    NO_DATA
}

fn no_data_f64() -> f64 {
    NO_DATA as f64
}

/// Statistics for one (bucket, video) pair. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Bucket start
    pub time: DateTime<Utc>,
    pub video_id: String,
    pub total_events: u64,
    #[serde(default = "no_data_f64")]
    pub max_viewership: f64,
    #[serde(default = "no_data_f64")]
    pub avg_viewership: f64,
    #[serde(default = "no_data_i64")]
    pub unique_views: i64,
}

/// `now` minus `hours`, never earlier than the Unix epoch.
fn hours_before(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    Duration::try_hours(hours)
        .and_then(|span| now.checked_sub_signed(span))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.max(DateTime::<Utc>::UNIX_EPOCH))
}

/// Retrospective window `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window ending `hours_until` hours before `now` and starting `hours_ago` hours before it.
    ///
    /// Both bounds saturate at the Unix epoch, so any hour count is accepted.
    pub fn trailing(now: DateTime<Utc>, hours_ago: i64, hours_until: i64) -> Self {
        Self {
            start: hours_before(now, hours_ago),
            end: hours_before(now, hours_until),
        }
    }

    /// Start exclusive, end inclusive.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start && ts <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Raw window parameters as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowParams {
    pub bucket: Option<String>,
    #[serde(rename = "hours-ago", alias = "hours_ago")]
    pub hours_ago: Option<String>,
    #[serde(rename = "hours-until", alias = "hours_until")]
    pub hours_until: Option<String>,
}

/// Parses a non-negative hour count, falling back when missing or invalid.
pub fn hours_or(raw: Option<&str>, fallback: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(fallback)
}

impl WindowParams {
    pub fn window(&self, now: DateTime<Utc>, default_hours_ago: i64) -> TimeWindow {
        let hours_ago = hours_or(self.hours_ago.as_deref(), default_hours_ago);
        let hours_until = hours_or(self.hours_until.as_deref(), DEFAULT_HOURS_UNTIL);
        TimeWindow::trailing(now, hours_ago, hours_until)
    }
}

/// Which videos an aggregation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateScope {
    /// All videos, ranked by distinct sessions
    Top,
    /// A single video
    Video(String),
}

/// A fully resolved aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub scope: AggregateScope,
    pub bucket: BucketWidth,
    pub window: TimeWindow,
}

impl AggregateQuery {
    /// True if `event` contributes to this query.
    pub fn matches(&self, event: &WatchEvent) -> bool {
        if event.video_state_label == CUED_LABEL || !self.window.contains(event.time) {
            return false;
        }
        match &self.scope {
            AggregateScope::Top => true,
            AggregateScope::Video(id) => &event.video_id == id,
        }
    }
}

#[derive(Default)]
struct Accumulator<'a> {
    count: u64,
    max: f64,
    sum: f64,
    sessions: HashSet<&'a str>,
}

/// Groups matching events by (bucket, video) and computes their statistics.
pub fn aggregate<'a, I>(events: I, query: &AggregateQuery) -> Vec<AggregateBucket>
where
    I: IntoIterator<Item = &'a WatchEvent>,
{
    let mut groups: BTreeMap<(DateTime<Utc>, &'a str), Accumulator<'a>> = BTreeMap::new();

    for event in events.into_iter().filter(|e| query.matches(e)) {
        let key = (query.bucket.align(event.time), event.video_id.as_str());
        let acc = groups.entry(key).or_default();
        if acc.count == 0 || event.current_time > acc.max {
            acc.max = event.current_time;
        }
        acc.count += 1;
        acc.sum += event.current_time;
        if let Some(ref session) = event.watch_session_id {
            acc.sessions.insert(session.as_str());
        }
    }

    let mut buckets: Vec<AggregateBucket> = groups
        .into_iter()
        .map(|((time, video_id), acc)| AggregateBucket {
            time,
            video_id: video_id.to_string(),
            total_events: acc.count,
            max_viewership: acc.max,
            avg_viewership: acc.sum / acc.count as f64,
            unique_views: acc.sessions.len() as i64,
        })
        .collect();

    sort_buckets(&mut buckets, &query.scope);
    buckets
}

/// Applies the result ordering for `scope`.
///
/// Top: bucket desc, unique_views desc, video_id asc.
/// Video: bucket desc, video_id asc.
pub fn sort_buckets(buckets: &mut [AggregateBucket], scope: &AggregateScope) {
    match scope {
        AggregateScope::Top => buckets.sort_by(|a, b| {
            b.time
                .cmp(&a.time)
                .then_with(|| b.unique_views.cmp(&a.unique_views))
                .then_with(|| a.video_id.cmp(&b.video_id))
        }),
        AggregateScope::Video(_) => buckets.sort_by(|a, b| {
            b.time.cmp(&a.time).then_with(|| a.video_id.cmp(&b.video_id))
        }),
    }
}
