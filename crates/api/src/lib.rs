//! HTTP API layer for Streamlens.

pub mod credentials;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use credentials::{AuthConfig, Credentials};
pub use routes::router;
pub use state::AppState;
