//! One service per component. HTTP handlers are thin adapters over these.

pub mod aggregation;
pub mod events;
pub mod ingest;
pub mod registry;
pub mod report;

use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::error;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::store::WatchStore;

pub use aggregation::AggregationEngine;
pub use events::EventManager;
pub use ingest::EventIngestor;
pub use registry::SessionRegistry;
pub use report::StatsReporter;

/// Logs backend failures before they are rendered opaquely.
pub(crate) fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        if e.is_opaque() {
            error!(operation, error = %e, "Store operation failed");
        }
    }
    result
}

/// Current time at the millisecond precision every backend stores.
pub(crate) fn stamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// All watch-telemetry services over one store.
#[derive(Clone)]
pub struct WatchServices {
    pub sessions: Arc<SessionRegistry>,
    pub ingestor: Arc<EventIngestor>,
    pub events: Arc<EventManager>,
    pub aggregation: Arc<AggregationEngine>,
    pub reporter: Arc<StatsReporter>,
    store: Arc<dyn WatchStore>,
}

impl WatchServices {
    pub fn new(store: Arc<dyn WatchStore>, config: ServiceConfig) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(store.clone())),
            ingestor: Arc::new(EventIngestor::new(store.clone())),
            events: Arc::new(EventManager::new(store.clone())),
            aggregation: Arc::new(AggregationEngine::new(store.clone(), config.aggregation)),
            reporter: Arc::new(StatsReporter::new(store.clone(), config.report)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn WatchStore> {
        &self.store
    }
}
