//! Storage traits
//!
//! Handlers only see these traits; the server wires in [`PgStore`] when a
//! database URL is configured and [`MemoryStore`] otherwise. Each call is an
//! independent unit of work and relies on the backend for isolation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::{ImageRecord, NewUser, Post, PostInput, Result, User};
use async_trait::async_trait;

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a user.
    ///
    /// Fails with `QuillError::DuplicateUser` if the username is taken, even
    /// when a concurrent insert slipped in after the caller's lookup.
    async fn create_user(&self, user: NewUser) -> Result<User>;
}

/// Post persistence
#[async_trait]
pub trait PostStore: Send + Sync {
    /// List posts ordered by creation time ascending, optionally filtered by
    /// exact title
    async fn list_posts(&self, title: Option<&str>) -> Result<Vec<Post>>;

    async fn create_post(&self, input: PostInput) -> Result<Post>;

    /// Fails with `QuillError::NotFound` when no post has this id
    async fn update_post(&self, id: i32, input: PostInput) -> Result<Post>;

    /// Returns the deleted post; `QuillError::NotFound` when absent
    async fn delete_post(&self, id: i32) -> Result<Post>;
}

/// Image persistence
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store a base64-encoded image
    async fn create_image(&self, image: String) -> Result<ImageRecord>;
}

/// Everything the API server needs from a backend
#[async_trait]
pub trait Store: UserStore + PostStore + ImageStore {
    /// Cheap liveness check against the backend
    async fn ping(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
