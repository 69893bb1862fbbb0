//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;
use telemetry::health;
use tracing::{debug, error};

use watch_core::WatchServices;

use crate::credentials::Credentials;

/// How often the background probe pings the store.
pub const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Watch-telemetry services over the configured store
    pub services: WatchServices,
    /// Signup, login and token validation
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(services: WatchServices, credentials: Arc<Credentials>) -> Self {
        Self {
            services,
            credentials,
        }
    }

    /// Pings the store and records the outcome in the health registry.
    pub async fn check_store(&self) -> bool {
        let store = self.services.store();
        match store.ping().await {
            Ok(()) => {
                debug!(backend = store.backend(), "Store healthy");
                health().store.set_healthy();
                true
            }
            Err(e) => {
                error!(backend = store.backend(), error = %e, "Store health check failed");
                health().store.set_unhealthy(e.to_string());
                false
            }
        }
    }

    /// Start the store health probe background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_health_probe(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                state.check_store().await;
            }
        })
    }
}
