//! API error handling and the JSON envelope
//!
//! Every response body is `{success, message, data}`. Failures keep their
//! internal kind for logging and collapse to a fixed external message.

use axum::{
    extract::rejection::FormRejection,
    extract::multipart::{MultipartError, MultipartRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quill_core::{ImageRecord, Post, QuillError, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// External message for every post failure
pub const POSTS_NOT_FOUND: &str = "Posts not found";

/// Uniform success envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    PostEnvelope = Envelope<Post>,
    PostListEnvelope = Envelope<Vec<Post>>,
    UserEnvelope = Envelope<UserProfile>,
    ImageEnvelope = Envelope<ImageRecord>
)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// Present (as `[]`) on post failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_empty_data(mut self) -> Self {
        self.data = Some(serde_json::Value::Array(vec![]));
        self
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Bad input shape; carries the first violated rule's message
    Validation(String),
    /// Username already registered
    DuplicateUser,
    /// Unknown user or wrong password; deliberately indistinguishable
    Authentication,
    /// Access guard rejection
    Unauthorized,
    /// Any failure inside a post handler
    Posts(QuillError),
    /// Uploaded bytes could not be processed as an image
    Image(String),
    /// Anything else; detail is logged, not returned
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateUser | AppError::Image(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Authentication | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Posts(err) => match err {
                QuillError::NotFound(_) => StatusCode::NOT_FOUND,
                QuillError::InvalidId(_) | QuillError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(msg) => ApiError::new(msg.clone()),
            AppError::DuplicateUser => ApiError::new("Email has already taken"),
            AppError::Authentication => ApiError::new("User or Password incorrect"),
            AppError::Unauthorized => ApiError::new("Unauthorized"),
            AppError::Posts(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, "Post operation failed");
                } else {
                    tracing::warn!(error = %err, "Post operation failed");
                }
                ApiError::new(POSTS_NOT_FOUND).with_empty_data()
            }
            AppError::Image(msg) => ApiError::new(msg.clone()),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                ApiError::new("An error occurred")
            }
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, AppError::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<QuillError> for AppError {
    fn from(err: QuillError) -> Self {
        match err {
            QuillError::Validation(msg) => AppError::Validation(msg),
            QuillError::DuplicateUser(_) => AppError::DuplicateUser,
            QuillError::Authentication => AppError::Authentication,
            QuillError::Image(msg) => AppError::Image(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(err.body_text())
    }
}
