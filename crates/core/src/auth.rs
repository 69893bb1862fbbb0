//! Bearer token extraction and JWT claims.

use serde::{Deserialize, Serialize};

use crate::error::{AuthErrorCode, Error, Result};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(auth_header: Option<&str>) -> Result<&str> {
    let header = auth_header
        .ok_or_else(|| Error::auth(AuthErrorCode::MissingToken, "Not authenticated"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| Error::auth(AuthErrorCode::InvalidToken, "Malformed authorization header"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::auth(
            AuthErrorCode::InvalidToken,
            "Authorization scheme must be Bearer",
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::auth(AuthErrorCode::MissingToken, "Not authenticated"));
    }
    Ok(token)
}
