//! PostgreSQL store
//!
//! Users, posts and images on a single `PgPool`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use super::{ImageStore, PostStore, Store, UserStore};
use crate::{ImageRecord, NewUser, Post, PostInput, QuillError, Result, User};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS posts_title_idx ON posts (title)",
    r#"
    CREATE TABLE IF NOT EXISTS images (
        id SERIAL PRIMARY KEY,
        image TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// PostgreSQL-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| QuillError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| QuillError::Database(format!("Migration failed: {e}")))?;
        }
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Post row from database
#[derive(Debug, FromRow)]
struct PostRow {
    id: i32,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Image row from database
#[derive(Debug, FromRow)]
struct ImageRow {
    id: i32,
    image: String,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        ImageRecord {
            id: row.id,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                QuillError::DuplicateUser(user.username.clone())
            }
            e => QuillError::Database(format!("Failed to create user: {e}")),
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn list_posts(&self, title: Option<&str>) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, title, content, created_at, updated_at
            FROM posts
            WHERE ($1::text IS NULL OR title = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to list posts: {e}")))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn create_post(&self, input: PostInput) -> Result<Post> {
        let row: PostRow = sqlx::query_as(
            r#"
            INSERT INTO posts (title, content)
            VALUES ($1, $2)
            RETURNING id, title, content, created_at, updated_at
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to create post: {e}")))?;

        Ok(row.into())
    }

    async fn update_post(&self, id: i32, input: PostInput) -> Result<Post> {
        let row: Option<PostRow> = sqlx::query_as(
            r#"
            UPDATE posts SET
                title = $2,
                content = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to update post: {e}")))?;

        row.map(Post::from)
            .ok_or_else(|| QuillError::NotFound(format!("post {id}")))
    }

    async fn delete_post(&self, id: i32) -> Result<Post> {
        let row: Option<PostRow> = sqlx::query_as(
            r#"
            DELETE FROM posts
            WHERE id = $1
            RETURNING id, title, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to delete post: {e}")))?;

        row.map(Post::from)
            .ok_or_else(|| QuillError::NotFound(format!("post {id}")))
    }
}

#[async_trait]
impl ImageStore for PgStore {
    async fn create_image(&self, image: String) -> Result<ImageRecord> {
        let row: ImageRow = sqlx::query_as(
            "INSERT INTO images (image) VALUES ($1) RETURNING id, image, created_at",
        )
        .bind(&image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| QuillError::Database(format!("Failed to store image: {e}")))?;

        Ok(row.into())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| QuillError::Database(format!("Ping failed: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
