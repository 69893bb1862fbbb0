//! Per-user dashboard rollups.
//!
//! Each section is computed independently so storage backends can push them
//! down as separate queries. The functions here are the in-process reference
//! used by the memory backend.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::events::WatchEvent;

/// Section sizes and horizons for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_top_videos_limit")]
    pub top_videos_limit: usize,
    #[serde(default = "default_trailing_days")]
    pub trailing_days: i64,
    #[serde(default = "default_engagement_limit")]
    pub engagement_limit: usize,
    #[serde(default = "default_engagement_min_events")]
    pub engagement_min_events: u64,
}

fn default_recent_limit() -> usize {
    10
}

fn default_top_videos_limit() -> usize {
    5
}

fn default_trailing_days() -> i64 {
    30
}

fn default_engagement_limit() -> usize {
    10
}

fn default_engagement_min_events() -> u64 {
    3
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            top_videos_limit: default_top_videos_limit(),
            trailing_days: default_trailing_days(),
            engagement_limit: default_engagement_limit(),
            engagement_min_events: default_engagement_min_events(),
        }
    }
}

impl ReportConfig {
    /// Start of the trailing histogram horizon.
    pub fn horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.trailing_days)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTotals {
    pub total_events: u64,
    pub unique_videos: u64,
    pub unique_sessions: u64,
    /// Raw sum of playback positions, a coarse proxy
    pub total_watch_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoActivity {
    pub video_id: String,
    pub video_title: String,
    pub event_count: u64,
    pub last_watched: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub event_count: u64,
    pub watch_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyActivity {
    /// 0 = Sunday
    pub day_of_week: u8,
    pub hour: u8,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEngagement {
    pub video_id: String,
    pub video_title: String,
    pub event_count: u64,
    pub avg_position: f64,
    pub max_position: f64,
    pub min_position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_count: u64,
    pub avg_position: Option<f64>,
    pub min_position: Option<f64>,
    pub max_position: Option<f64>,
}

/// Dashboard snapshot for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsSnapshot {
    pub user_id: Uuid,
    pub totals: UserTotals,
    pub recent_events: Vec<WatchEvent>,
    pub top_videos: Vec<VideoActivity>,
    pub daily_activity: Vec<DailyActivity>,
    pub hourly_activity: Vec<HourlyActivity>,
    pub engagement: Vec<VideoEngagement>,
    pub session_summary: SessionSummary,
}

pub fn totals(events: &[&WatchEvent]) -> UserTotals {
    let videos: HashSet<&str> = events.iter().map(|e| e.video_id.as_str()).collect();
    let sessions: HashSet<&str> = events
        .iter()
        .filter_map(|e| e.watch_session_id.as_deref())
        .collect();
    UserTotals {
        total_events: events.len() as u64,
        unique_videos: videos.len() as u64,
        unique_sessions: sessions.len() as u64,
        total_watch_time: events.iter().map(|e| e.current_time).sum(),
    }
}

pub fn recent_events(events: &[&WatchEvent], limit: usize) -> Vec<WatchEvent> {
    let mut sorted: Vec<&WatchEvent> = events.to_vec();
    sorted.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.id.cmp(&b.id)));
    sorted.into_iter().take(limit).cloned().collect()
}

struct VideoAcc<'a> {
    count: u64,
    latest: DateTime<Utc>,
    title: &'a str,
    sum: f64,
    min: f64,
    max: f64,
}

fn per_video<'a>(events: &[&'a WatchEvent]) -> BTreeMap<&'a str, VideoAcc<'a>> {
    let mut videos: BTreeMap<&'a str, VideoAcc<'a>> = BTreeMap::new();
    for event in events {
        let acc = videos.entry(event.video_id.as_str()).or_insert(VideoAcc {
            count: 0,
            latest: event.time,
            title: event.video_title.as_str(),
            sum: 0.0,
            min: event.current_time,
            max: event.current_time,
        });
        acc.count += 1;
        acc.sum += event.current_time;
        acc.min = acc.min.min(event.current_time);
        acc.max = acc.max.max(event.current_time);
        if event.time >= acc.latest {
            acc.latest = event.time;
            acc.title = event.video_title.as_str();
        }
    }
    videos
}

/// Most-watched videos by event count, ties broken by video_id.
pub fn top_videos(events: &[&WatchEvent], limit: usize) -> Vec<VideoActivity> {
    let mut videos: Vec<VideoActivity> = per_video(events)
        .into_iter()
        .map(|(video_id, acc)| VideoActivity {
            video_id: video_id.to_string(),
            video_title: acc.title.to_string(),
            event_count: acc.count,
            last_watched: acc.latest,
        })
        .collect();
    videos.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.video_id.cmp(&b.video_id))
    });
    videos.truncate(limit);
    videos
}

pub fn daily_activity(events: &[&WatchEvent], since: DateTime<Utc>) -> Vec<DailyActivity> {
    let mut days: BTreeMap<NaiveDate, (u64, f64)> = BTreeMap::new();
    for event in events.iter().filter(|e| e.time >= since) {
        let entry = days.entry(event.time.date_naive()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += event.current_time;
    }
    days.into_iter()
        .map(|(date, (event_count, watch_time))| DailyActivity {
            date,
            event_count,
            watch_time,
        })
        .collect()
}

pub fn hourly_activity(events: &[&WatchEvent], since: DateTime<Utc>) -> Vec<HourlyActivity> {
    let mut cells: BTreeMap<(u8, u8), u64> = BTreeMap::new();
    for event in events.iter().filter(|e| e.time >= since) {
        let dow = event.time.weekday().num_days_from_sunday() as u8;
        let hour = event.time.hour() as u8;
        *cells.entry((dow, hour)).or_insert(0) += 1;
    }
    cells
        .into_iter()
        .map(|((day_of_week, hour), event_count)| HourlyActivity {
            day_of_week,
            hour,
            event_count,
        })
        .collect()
}

/// Videos with at least `min_events` events, by event count then video_id.
pub fn engagement(events: &[&WatchEvent], min_events: u64, limit: usize) -> Vec<VideoEngagement> {
    let mut videos: Vec<VideoEngagement> = per_video(events)
        .into_iter()
        .filter(|(_, acc)| acc.count >= min_events)
        .map(|(video_id, acc)| VideoEngagement {
            video_id: video_id.to_string(),
            video_title: acc.title.to_string(),
            event_count: acc.count,
            avg_position: acc.sum / acc.count as f64,
            max_position: acc.max,
            min_position: acc.min,
        })
        .collect();
    videos.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.video_id.cmp(&b.video_id))
    });
    videos.truncate(limit);
    videos
}

pub fn session_summary(events: &[&WatchEvent]) -> SessionSummary {
    let sessions: HashSet<&str> = events
        .iter()
        .filter_map(|e| e.watch_session_id.as_deref())
        .collect();
    if events.is_empty() {
        return SessionSummary::default();
    }
    let positions = events.iter().map(|e| e.current_time);
    let sum: f64 = positions.clone().sum();
    SessionSummary {
        session_count: sessions.len() as u64,
        avg_position: Some(sum / events.len() as f64),
        min_position: positions.clone().reduce(f64::min),
        max_position: positions.reduce(f64::max),
    }
}
