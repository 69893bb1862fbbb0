//! Core types, validation, aggregation, and services for Streamlens.

pub mod account;
pub mod aggregate;
pub mod auth;
pub mod bucket;
pub mod config;
pub mod error;
pub mod events;
pub mod limits;
pub mod schema;
pub mod service;
pub mod session;
pub mod stats;
pub mod store;

pub use account::*;
pub use aggregate::{AggregateBucket, AggregateQuery, AggregateScope, TimeWindow, WindowParams};
pub use auth::*;
pub use bucket::{BucketUnit, BucketWidth};
pub use config::*;
pub use error::{AuthErrorCode, Error, Result, ValidationErrorCode};
pub use events::*;
pub use service::WatchServices;
pub use session::*;
pub use stats::{ReportConfig, UserStatsSnapshot};
pub use store::{AccountStore, WatchStore};
