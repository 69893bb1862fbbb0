//! Credential service: signup, login and bearer token validation.
//!
//! Passwords are hashed with Argon2id. Access tokens are HS256 JWTs whose
//! `sub` is the user id. Successful lookups are cached for 30 seconds.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration as TokenTtl, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use watch_core::{
    AccountStore, AuthErrorCode, Error, LoginRequest, Result, SignupRequest, TokenClaims,
    TokenResponse, User,
};

/// Cache TTL for token lookups (30 seconds).
const AUTH_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum cache entries.
const AUTH_CACHE_MAX_CAPACITY: u64 = 10_000;

const MIN_SECRET_LEN: usize = 32;

/// Token signing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret, at least 32 bytes
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

fn default_token_ttl_minutes() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
            issuer: None,
            audience: None,
        }
    }
}

fn invalid_token() -> Error {
    Error::auth(AuthErrorCode::InvalidToken, "Could not validate credentials")
}

fn invalid_credentials() -> Error {
    Error::auth(AuthErrorCode::InvalidCredentials, "Invalid credentials")
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(format!("password hash failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::internal(format!("invalid password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::internal(format!("password verification failed: {}", e))),
    }
}

/// Runs Argon2 off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("password task failed: {}", e)))?
}

pub struct Credentials {
    accounts: Arc<dyn AccountStore>,
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// Access token -> user
    cache: Cache<String, User>,
}

impl Credentials {
    /// Fails if the secret is shorter than 32 bytes.
    pub fn new(accounts: Arc<dyn AccountStore>, config: AuthConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(Error::internal(format!(
                "auth secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match config.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            accounts,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
            cache: Cache::builder()
                .max_capacity(AUTH_CACHE_MAX_CAPACITY)
                .time_to_live(AUTH_CACHE_TTL)
                .build(),
        })
    }

    /// Registers a user and returns a fresh access token.
    pub async fn signup(&self, request: SignupRequest) -> Result<TokenResponse> {
        let (username, email) = request.normalized()?;
        let password = request.password;
        let password_hash = blocking(move || hash_password(&password)).await?;

        let user = self
            .accounts
            .insert_user(User {
                id: Uuid::new_v4(),
                username,
                email,
                password_hash,
                created_at: Utc::now(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        self.issue(user.id)
    }

    /// Checks a username and password. Unknown users and wrong passwords
    /// fail identically.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse> {
        let Some(user) = self
            .accounts
            .find_user_by_username(request.username.trim())
            .await?
        else {
            warn!(username = %request.username.trim(), "Login for unknown user");
            return Err(invalid_credentials());
        };

        let password = request.password;
        let hash = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &hash)).await? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(invalid_credentials());
        }

        info!(user_id = %user.id, "User logged in");
        self.issue(user.id)
    }

    /// Resolves a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        if let Some(user) = self.cache.get(token).await {
            debug!("Auth cache hit");
            return Ok(user);
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    Error::auth(AuthErrorCode::ExpiredToken, "Token has expired")
                }
                _ => invalid_token(),
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| invalid_token())?;
        let user = self
            .accounts
            .find_user(user_id)
            .await?
            .ok_or_else(invalid_token)?;

        self.cache.insert(token.to_string(), user.clone()).await;
        Ok(user)
    }

    fn issue(&self, user_id: Uuid) -> Result<TokenResponse> {
        self.issue_at(user_id, Utc::now()).map(TokenResponse::bearer)
    }

    /// Signs a token as if issued at `now`.
    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + TokenTtl::minutes(self.config.token_ttl_minutes)).timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Error::internal(format!("token signing failed: {}", e)))
    }
}
