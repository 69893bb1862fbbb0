//! Field bounds and query defaults.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Watch event fields (chars) ===

pub const MAX_VIDEO_ID_LEN: usize = 32;

pub const MAX_VIDEO_TITLE_LEN: usize = 255;

pub const MAX_STATE_LABEL_LEN: usize = 64;

/// Matches the HTTP Referer column width.
pub const MAX_REFERER_LEN: usize = 255;

pub const MAX_SESSION_TOKEN_LEN: usize = 64;

pub const MAX_PATH_LEN: usize = 255;

pub const MIN_STATE_VALUE: i32 = -1;

pub const MAX_STATE_VALUE: i32 = 5;

/// Label excluded from every aggregate.
pub const CUED_LABEL: &str = "CUED";

// === Listing ===

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

pub const MAX_PAGE_LIMIT: i64 = 1000;

// === Aggregation defaults ===

pub const DEFAULT_BUCKET: &str = "1 day";

pub const DEFAULT_TOP_HOURS_AGO: i64 = 10;

/// 24 * 31 * 3: roughly one quarter.
pub const DEFAULT_VIDEO_HOURS_AGO: i64 = 2232;

pub const DEFAULT_HOURS_UNTIL: i64 = 0;

// === Accounts ===

pub const MIN_USERNAME_LEN: usize = 3;

pub const MAX_USERNAME_LEN: usize = 50;

pub const MIN_PASSWORD_LEN: usize = 8;
