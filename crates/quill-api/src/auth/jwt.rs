//! Session token issuing and verification
//!
//! Tokens are HS256 JWTs carrying `{username, exp}`. Signature checking and
//! expiry checking are separate steps so the access guard can run them in
//! its own order; expiry is compared against an explicit `now` with no
//! leeway.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quill_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use utoipa::ToSchema;

/// Token payload
///
/// `exp` is optional on decode so that a correctly signed token without an
/// expiry reaches the expiry check and is rejected there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Username (email) of the session owner
    #[schema(example = "a@example.com")]
    pub username: String,
    /// Expiration timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1700000060)]
    pub exp: Option<u64>,
}

impl Claims {
    /// True only if `exp` is present and strictly after `now`
    pub fn is_live_at(&self, now: u64) -> bool {
        matches!(self.exp, Some(exp) if exp > now)
    }
}

/// JWT generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Validity window in seconds
    pub expiration_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_secs,
        }
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.token_ttl_secs)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Issue a token for `username` valid from now
pub fn generate_token(config: &JwtConfig, username: &str) -> Result<(Claims, String), JwtError> {
    generate_token_at(config, username, unix_now()?)
}

/// Issue a token as if the current time were `now`
///
/// Returns the payload alongside the encoded token; login echoes both.
pub fn generate_token_at(
    config: &JwtConfig,
    username: &str,
    now: u64,
) -> Result<(Claims, String), JwtError> {
    let claims = Claims {
        username: username.to_string(),
        exp: Some(now + config.expiration_secs),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok((claims, token))
}

/// Verify the signature and decode the payload without looking at `exp`
pub fn decode_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Verify signature, then require `exp` strictly after `now`
pub fn validate_token_at(config: &JwtConfig, token: &str, now: u64) -> Result<Claims, JwtError> {
    let claims = decode_token(config, token)?;
    if !claims.is_live_at(now) {
        return Err(JwtError::ExpiredToken);
    }
    Ok(claims)
}
