//! Quill Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used by the Quill API server:
//! - User, post and image records
//! - Common error types
//! - Storage traits for credentials, posts and images
//! - Configuration management
//! - PostgreSQL and in-memory storage backends

pub mod config;
pub mod store;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig, UploadConfig,
};
pub use store::{ImageStore, MemoryStore, PgStore, PostStore, Store, UserStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Quill operations
#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Invalid credentials")]
    Authentication,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Image processing error: {0}")]
    Image(String),
}

pub type Result<T> = std::result::Result<T, QuillError>;

// ============================================================================
// Users
// ============================================================================

/// Stored credential record
///
/// The password hash never leaves the server: it is skipped on
/// serialization, and responses use [`UserProfile`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Credential record to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Public projection of a [`User`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "a@example.com")]
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Hello")]
    pub title: String,
    #[schema(example = "First post")]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written on post create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

impl PostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

// ============================================================================
// Images
// ============================================================================

/// Stored image, base64-encoded JPEG
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: i32,
    /// Base64 of the compressed JPEG bytes
    pub image: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================
