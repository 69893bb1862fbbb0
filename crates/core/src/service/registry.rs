//! Session registry: touch on ingestion plus owner-scoped management.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{logged, stamp_now};
use crate::error::{Error, Result};
use crate::schema::{validate_optional_referer, validate_session_draft};
use crate::session::{SessionDraft, WatchSession};
use crate::store::WatchStore;

const ENTITY: &str = "Watch session";

pub struct SessionRegistry {
    store: Arc<dyn WatchStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn WatchStore>) -> Self {
        Self { store }
    }

    /// Advances the session's last-active time. Unknown tokens return false.
    pub async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        let found = logged("touch_session", self.store.touch_session(token, at).await)?;
        if !found {
            debug!(session = %token, "Touch for unknown session ignored");
        }
        Ok(found)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        referer: Option<&str>,
        draft: SessionDraft,
    ) -> Result<WatchSession> {
        let referer = validate_optional_referer(referer)?;
        validate_session_draft(&draft)?;

        let session = draft.into_session(user_id, referer, stamp_now());
        let session = logged("create_session", self.store.create_session(session).await)?;
        info!(
            user_id = %user_id,
            session = %session.watch_session_id,
            "Watch session created"
        );
        Ok(session)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WatchSession>> {
        logged("list_sessions", self.store.list_sessions(user_id).await)
    }

    /// Missing and not-owned sessions are indistinguishable.
    pub async fn get(&self, user_id: Uuid, token: &str) -> Result<WatchSession> {
        match logged("get_session", self.store.get_session(token).await)? {
            Some(session) if session.user_id == user_id => Ok(session),
            Some(_) => {
                warn!(user_id = %user_id, session = %token, "Access to foreign session denied");
                Err(Error::not_found(ENTITY))
            }
            None => Err(Error::not_found(ENTITY)),
        }
    }

    /// Rewrites video_id and path. The token, referer and last_active are kept.
    pub async fn update(&self, user_id: Uuid, token: &str, draft: SessionDraft) -> Result<WatchSession> {
        validate_session_draft(&draft)?;
        let mut session = self.get(user_id, token).await?;
        session.video_id = Some(draft.video_id);
        session.path = draft.path;
        logged("update_session", self.store.update_session(&session).await)?;
        Ok(session)
    }

    /// Deletes the session. Events keep their session id by value.
    pub async fn delete(&self, user_id: Uuid, token: &str) -> Result<()> {
        self.get(user_id, token).await?;
        if !logged("delete_session", self.store.delete_session(token).await)? {
            return Err(Error::not_found(ENTITY));
        }
        info!(user_id = %user_id, session = %token, "Watch session deleted");
        Ok(())
    }
}
