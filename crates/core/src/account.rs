//! User accounts and credential payloads.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result, ValidationErrorCode};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid username regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// A registered user. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    if USERNAME_PATTERN.is_match(username.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some("may only contain letters, numbers, underscores and hyphens".into());
        Err(err)
    }
}

fn validate_email(email: &str) -> std::result::Result<(), ValidationError> {
    if EMAIL_PATTERN.is_match(email.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("is not a valid email address".into());
        Err(err)
    }
}

fn validate_password_strength(password: &str) -> std::result::Result<(), ValidationError> {
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if upper && lower && digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password");
        err.message = Some("needs an uppercase letter, a lowercase letter and a digit".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 50), custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(length(min = 8), custom(function = "validate_password_strength"))]
    pub password: String,
}

impl SignupRequest {
    /// Validates and returns trimmed username and lower-cased email.
    pub fn normalized(&self) -> Result<(String, String)> {
        let trimmed = Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
        };
        trimmed.validate().map_err(|errors| {
            let field_errors = errors.field_errors();
            let (field, message) = ["username", "email", "password"]
                .into_iter()
                .find_map(|f| {
                    field_errors.get(f).map(|list| {
                        let message = list
                            .first()
                            .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                            .unwrap_or_else(|| match f {
                                "username" => "must be 3-50 characters".to_string(),
                                _ => "must be at least 8 characters".to_string(),
                            });
                        (f, message)
                    })
                })
                .unwrap_or(("body", errors.to_string()));
            Error::validation(ValidationErrorCode::Account, field, message)
        })?;
        Ok((trimmed.username, trimmed.email))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}
