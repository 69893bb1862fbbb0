//! Event ingestion.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{logged, stamp_now};
use crate::error::Result;
use crate::events::WatchEvent;
use crate::schema::{validate_ingest, IngestRequest};
use crate::store::WatchStore;

pub struct EventIngestor {
    store: Arc<dyn WatchStore>,
}

impl EventIngestor {
    pub fn new(store: Arc<dyn WatchStore>) -> Self {
        Self { store }
    }

    /// Validates and persists one player state change.
    ///
    /// Checks run in order: referer, session token, body shape, then fields.
    /// Nothing is written unless every check passes.
    pub async fn ingest(
        &self,
        user_id: Uuid,
        referer: Option<&str>,
        session_token: Option<&str>,
        body: &[u8],
    ) -> Result<WatchEvent> {
        let request = validate_ingest(referer, session_token, body)?;
        self.record(user_id, request).await
    }

    /// Persists an already validated request.
    pub async fn record(&self, user_id: Uuid, request: IngestRequest) -> Result<WatchEvent> {
        let IngestRequest {
            referer,
            session_token,
            state,
        } = request;

        let event = WatchEvent::new(user_id, referer, state, stamp_now());
        let event = logged(
            "insert_event",
            self.store
                .insert_event(event, session_token.as_deref())
                .await,
        )?;

        info!(
            event_id = %event.id,
            user_id = %user_id,
            video_id = %event.video_id,
            label = %event.video_state_label,
            session = event.watch_session_id.as_deref().unwrap_or("none"),
            "Watch event recorded"
        );
        Ok(event)
    }
}
