//! In-memory store
//!
//! Backs the test router and local runs without `DATABASE_URL`. All tables
//! sit behind one lock so the username uniqueness check and the insert are a
//! single step.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ImageStore, PostStore, Store, UserStore};
use crate::{ImageRecord, NewUser, Post, PostInput, QuillError, Result, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    images: Vec<ImageRecord>,
    next_user_id: i32,
    next_post_id: i32,
    next_image_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Volatile store with the same semantics as [`super::PgStore`]
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored images
    pub async fn image_count(&self) -> usize {
        self.tables.read().await.images.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(QuillError::DuplicateUser(user.username));
        }

        let record = User {
            id: next_id(&mut tables.next_user_id),
            username: user.username,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, title: Option<&str>) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| title.map_or(true, |t| p.title == t))
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn create_post(&self, input: PostInput) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let post = Post {
            id: next_id(&mut tables.next_post_id),
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i32, input: PostInput) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| QuillError::NotFound(format!("post {id}")))?;

        post.title = input.title;
        post.content = input.content;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i32) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let index = tables
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| QuillError::NotFound(format!("post {id}")))?;
        Ok(tables.posts.remove(index))
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn create_image(&self, image: String) -> Result<ImageRecord> {
        let mut tables = self.tables.write().await;
        let record = ImageRecord {
            id: next_id(&mut tables.next_image_id),
            image,
            created_at: Utc::now(),
        };
        tables.images.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
