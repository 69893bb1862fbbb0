//! Shared helpers for the Streamlens integration tests.

pub mod setup;
