//! Post handlers
//!
//! Every failure, whatever its cause, answers "Posts not found" with an
//! empty `data` array. The cause is kept in [`AppError::Posts`] and logged.

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, Envelope, PostEnvelope, PostListEnvelope};
use crate::state::AppState;
use axum::{
    extract::{rejection::FormRejection, Path, State},
    Extension, Form, Json,
};
use quill_core::{Post, PostInput, QuillError};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Create form; absent fields become empty strings
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreatePostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Update form
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostForm {
    /// Numeric post id, sent as text
    #[serde(default)]
    #[schema(example = "1")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

type PostResult<T> = Result<Json<Envelope<T>>, AppError>;

fn post_error(err: QuillError) -> AppError {
    AppError::Posts(err)
}

fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    form.map(|Form(body)| body)
        .map_err(|rejection| post_error(QuillError::Validation(rejection.body_text())))
}

/// Parse a post id; anything but a plain integer is rejected
pub fn parse_post_id(raw: &str) -> Result<i32, QuillError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| QuillError::InvalidId(raw.to_string()))
}

/// List all posts, oldest first
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    security(("bearer_cookie" = [])),
    responses(
        (status = 200, description = "Posts retrieved", body = PostListEnvelope),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Posts not found", body = crate::error::ApiError),
    )
)]
pub async fn list_posts(State(state): State<Arc<AppState>>) -> PostResult<Vec<Post>> {
    let posts = state.store.list_posts(None).await.map_err(post_error)?;
    Ok(Json(Envelope::ok("Posts retrieved successfully", posts)))
}

/// List posts whose title matches exactly
#[utoipa::path(
    get,
    path = "/api/posts/{title}",
    tag = "posts",
    security(("bearer_cookie" = [])),
    params(("title" = String, Path, description = "Exact post title")),
    responses(
        (status = 200, description = "Posts retrieved, possibly none", body = PostListEnvelope),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    )
)]
pub async fn list_posts_by_title(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> PostResult<Vec<Post>> {
    let posts = state
        .store
        .list_posts(Some(&title))
        .await
        .map_err(post_error)?;
    Ok(Json(Envelope::ok("Posts retrieved successfully", posts)))
}

/// Create a post
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    security(("bearer_cookie" = [])),
    request_body(content = CreatePostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Post created", body = PostEnvelope),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Posts not found", body = crate::error::ApiError),
    )
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Result<Form<CreatePostForm>, FormRejection>,
) -> PostResult<Post> {
    let CreatePostForm { title, content } = form_body(form)?;

    let post = state
        .store
        .create_post(PostInput::new(title, content))
        .await
        .map_err(post_error)?;

    tracing::info!(post_id = post.id, user = %user.username, "Post created");
    Ok(Json(Envelope::ok("Post created successfully", post)))
}

/// Replace a post's title and content
#[utoipa::path(
    put,
    path = "/api/posts",
    tag = "posts",
    security(("bearer_cookie" = [])),
    request_body(content = UpdatePostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Post updated", body = PostEnvelope),
        (status = 400, description = "Malformed id", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 404, description = "No such post", body = crate::error::ApiError),
    )
)]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Result<Form<UpdatePostForm>, FormRejection>,
) -> PostResult<Post> {
    let UpdatePostForm { id, title, content } = form_body(form)?;
    let id = parse_post_id(&id).map_err(post_error)?;

    let post = state
        .store
        .update_post(id, PostInput::new(title, content))
        .await
        .map_err(post_error)?;

    tracing::info!(post_id = post.id, user = %user.username, "Post updated");
    Ok(Json(Envelope::ok("Post updated successfully", post)))
}

/// Delete a post, returning it
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    security(("bearer_cookie" = [])),
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = PostEnvelope),
        (status = 400, description = "Malformed id", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 404, description = "No such post", body = crate::error::ApiError),
    )
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> PostResult<Post> {
    let id = parse_post_id(&id).map_err(post_error)?;
    let post = state.store.delete_post(id).await.map_err(post_error)?;

    tracing::info!(post_id = post.id, user = %user.username, "Post deleted");
    Ok(Json(Envelope::ok("Post deleted successfully", post)))
}
