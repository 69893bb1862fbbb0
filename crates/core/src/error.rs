//! Unified error types for Streamlens.
//!
//! Error codes:
//! - AUTH_001-004: Authentication errors
//! - VALID_001-010: Validation errors
//! - NOT_FOUND_001: Missing or not-owned records
//! - QUERY_001: Malformed aggregation query
//! - CONFLICT_001: Duplicate identity
//! - DB_001: Persistence errors
//! - INTERNAL_001: Anything else

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: Bearer token is required
    MissingToken,
    /// AUTH_002: Token is malformed, forged, or names an unknown user
    InvalidToken,
    /// AUTH_003: Token has expired
    ExpiredToken,
    /// AUTH_004: Username or password is wrong
    InvalidCredentials,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "AUTH_001",
            Self::InvalidToken => "AUTH_002",
            Self::ExpiredToken => "AUTH_003",
            Self::InvalidCredentials => "AUTH_004",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        401
    }
}

/// Validation error codes, one per checked input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Body is not valid JSON of the expected shape
    InvalidFormat,
    /// VALID_002: Referer header missing or too long
    Referer,
    /// VALID_003: Session token header malformed
    SessionToken,
    /// VALID_004: video_id out of bounds
    VideoId,
    /// VALID_005: video_title out of bounds
    VideoTitle,
    /// VALID_006: current_time negative
    CurrentTime,
    /// VALID_007: video_state_label out of bounds
    StateLabel,
    /// VALID_008: video_state_value outside [-1, 5]
    StateValue,
    /// VALID_009: session path out of bounds
    Path,
    /// VALID_010: signup/login field rejected
    Account,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::Referer => "VALID_002",
            Self::SessionToken => "VALID_003",
            Self::VideoId => "VALID_004",
            Self::VideoTitle => "VALID_005",
            Self::CurrentTime => "VALID_006",
            Self::StateLabel => "VALID_007",
            Self::StateValue => "VALID_008",
            Self::Path => "VALID_009",
            Self::Account => "VALID_010",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Unified error type for Streamlens.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication error with code.
    #[error("[{code}] {message}")]
    Auth {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Validation error with code and the offending field.
    #[error("[{code}] {field}: {message}")]
    Validation {
        code: &'static str,
        field: &'static str,
        message: String,
        http_status: u16,
    },

    /// Record is missing or belongs to another user. Both render the same.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Aggregation parameters could not be interpreted.
    #[error("invalid query: {0}")]
    Query(String),

    /// Identity already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage backend failure. The message is for logs only.
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an authentication error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Auth {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a validation error for a field.
    pub fn validation(code: ValidationErrorCode, field: &'static str, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            field,
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth { http_status, .. } => *http_status,
            Self::Validation { http_status, .. } => *http_status,
            Self::NotFound(_) => 404,
            Self::Query(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) => 500,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the wire error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Auth { code, .. } => code,
            Self::Validation { code, .. } => code,
            Self::NotFound(_) => "NOT_FOUND_001",
            Self::Query(_) => "QUERY_001",
            Self::Conflict(_) => "CONFLICT_001",
            Self::Database(_) => "DB_001",
            Self::Serialization(_) => ValidationErrorCode::InvalidFormat.code(),
            Self::Internal(_) => "INTERNAL_001",
        }
    }

    /// True for failures whose detail must not reach the client.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}
