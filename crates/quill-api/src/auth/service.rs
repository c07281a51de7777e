//! Authentication service layer
//!
//! Registration and login on top of the credential store. Input shape is
//! validated first; the first violated rule's message is surfaced.

use super::jwt::{generate_token, Claims, JwtConfig};
use super::password::{
    check_password_policy, hash_password_with_config, verify_password, PasswordConfig,
};
use crate::error::AppError;
use quill_core::{NewUser, Store, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// Register and login form
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct Credentials {
    /// Email address used as username
    #[serde(default)]
    #[validate(email(message = "Invalid email"))]
    #[schema(example = "a@example.com")]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "String must contain at least 6 character(s)"))]
    #[schema(example = "abc123")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Validate in field order: username, password length, password policy
    pub fn check(&self) -> Result<(), AppError> {
        if let Err(errors) = self.validate() {
            if let Some(message) = first_message(&errors, &["username", "password"]) {
                return Err(AppError::Validation(message));
            }
        }
        check_password_policy(&self.password).map_err(AppError::Validation)
    }
}

fn first_message(errors: &ValidationErrors, field_order: &[&str]) -> Option<String> {
    let fields = errors.field_errors();
    field_order.iter().find_map(|field| {
        fields.get(*field).and_then(|list| list.first()).map(|err| {
            err.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid {field}"))
        })
    })
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub payload: Claims,
    pub token: String,
}

/// Plaintext behind the hash verified when the username is unknown
const DUMMY_PASSWORD: &str = "unknown-user-0";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    /// Hash under `password_config`, built on the first unknown-user login
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn Store>, jwt_config: JwtConfig, password_config: PasswordConfig) -> Self {
        Self {
            store,
            jwt_config,
            password_config,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let config = self.password_config.clone();
        tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
    }

    async fn dummy_hash(&self) -> Result<String, AppError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash_blocking(DUMMY_PASSWORD.to_string()))
            .await
            .cloned()
    }

    /// Register a new user
    ///
    /// * `Ok(UserProfile)` - The stored user, without the hash
    /// * `Err(AppError::Validation)` - Bad username or password shape
    /// * `Err(AppError::DuplicateUser)` - Username taken
    pub async fn register(&self, request: Credentials) -> Result<UserProfile, AppError> {
        request.check()?;

        if self
            .store
            .find_user_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateUser);
        }

        let password_hash = self.hash_blocking(request.password).await?;

        // The store enforces uniqueness too, for registrations racing past the lookup
        let user = self
            .store
            .create_user(NewUser {
                username: request.username,
                password_hash,
            })
            .await?;

        Ok(UserProfile::from(user))
    }

    /// Login with username and password
    ///
    /// Unknown user and wrong password both yield `AppError::Authentication`.
    /// An unknown user is still checked against a dummy hash with the same
    /// cost, so both failures take as long.
    pub async fn login(&self, request: Credentials) -> Result<LoginResponse, AppError> {
        request.check()?;

        let user = self.store.find_user_by_username(&request.username).await?;
        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash().await?,
        };

        let password = request.password;
        let password_valid =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(format!("Verification task failed: {e}")))?
                .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        let user = match user {
            Some(user) if password_valid => user,
            _ => return Err(AppError::Authentication),
        };

        let (payload, token) = generate_token(&self.jwt_config, &user.username)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {e}")))?;

        Ok(LoginResponse { payload, token })
    }

    /// Token validity window in seconds
    pub fn token_ttl_secs(&self) -> u64 {
        self.jwt_config.expiration_secs
    }
}
