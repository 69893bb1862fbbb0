//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use telemetry::metrics;
use tracing::warn;
use uuid::Uuid;

use watch_core::{extract_bearer, Error, User};

use crate::response::ApiError;
use crate::state::AppState;

/// Header carrying the client's watch session token.
pub const SESSION_HEADER: &str = "x-session-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user = match extract_bearer(auth_header) {
            Ok(token) => state.credentials.authenticate(token).await,
            Err(e) => Err(e),
        };

        user.map(AuthUser).map_err(|e| {
            metrics().auth_failures.inc();
            warn!(code = e.error_code(), path = %parts.uri.path(), "Request not authenticated");
            ApiError::from(e)
        })
    }
}

/// Watch headers: `Referer` and the optional session token.
///
/// Absent or non-UTF-8 headers come through as `None`; the services decide
/// whether that is an error.
#[derive(Debug, Clone, Default)]
pub struct WatchHeaders {
    pub referer: Option<String>,
    pub session_token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for WatchHeaders
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let get = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };

        Ok(WatchHeaders {
            referer: get(header::REFERER.as_str()),
            session_token: get(SESSION_HEADER),
        })
    }
}

/// Parses a JSON body, reporting malformed input as VALID_001.
pub fn json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::from(Error::from(e)))
}

/// Parses an event id path segment. Anything that is not a UUID names no
/// event, so it is reported as not found.
pub fn event_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::from(Error::not_found("Watch event")))
}
