//! Service configuration passed to component constructors.

use serde::{Deserialize, Serialize};

use crate::limits::{DEFAULT_TOP_HOURS_AGO, DEFAULT_VIDEO_HOURS_AGO};
use crate::stats::ReportConfig;

/// Default look-back windows for aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_top_hours_ago")]
    pub top_hours_ago: i64,
    #[serde(default = "default_video_hours_ago")]
    pub video_hours_ago: i64,
}

fn default_top_hours_ago() -> i64 {
    DEFAULT_TOP_HOURS_AGO
}

fn default_video_hours_ago() -> i64 {
    DEFAULT_VIDEO_HOURS_AGO
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            top_hours_ago: default_top_hours_ago(),
            video_hours_ago: default_video_hours_ago(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub report: ReportConfig,
}
