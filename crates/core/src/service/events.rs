//! Owner-scoped watch event management.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::logged;
use crate::error::{Error, Result};
use crate::events::{Page, WatchEvent};
use crate::schema::{parse_player_state, validate_player_state};
use crate::store::WatchStore;

const ENTITY: &str = "Watch event";

pub struct EventManager {
    store: Arc<dyn WatchStore>,
}

impl EventManager {
    pub fn new(store: Arc<dyn WatchStore>) -> Self {
        Self { store }
    }

    /// Missing and not-owned events are indistinguishable.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<WatchEvent> {
        match logged("get_event", self.store.get_event(id).await)? {
            Some(event) if event.user_id == user_id => Ok(event),
            Some(_) => {
                warn!(user_id = %user_id, event_id = %id, "Access to foreign event denied");
                Err(Error::not_found(ENTITY))
            }
            None => Err(Error::not_found(ENTITY)),
        }
    }

    pub async fn list(&self, user_id: Uuid, page: Page) -> Result<Vec<WatchEvent>> {
        let events = logged("list_events", self.store.list_events(user_id, page).await)?;
        debug!(
            user_id = %user_id,
            limit = page.limit,
            offset = page.offset,
            returned = events.len(),
            "Listed watch events"
        );
        Ok(events)
    }

    /// Rewrites the player-state fields from a JSON body.
    pub async fn update(&self, user_id: Uuid, id: Uuid, body: &[u8]) -> Result<WatchEvent> {
        let state = parse_player_state(body)?;
        validate_player_state(&state)?;

        let mut event = self.get(user_id, id).await?;
        event.apply(state);
        logged("update_event", self.store.update_event(&event).await)?;
        info!(event_id = %id, user_id = %user_id, "Watch event updated");
        Ok(event)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.get(user_id, id).await?;
        if !logged("delete_event", self.store.delete_event(id).await)? {
            return Err(Error::not_found(ENTITY));
        }
        info!(event_id = %id, user_id = %user_id, "Watch event deleted");
        Ok(())
    }
}
