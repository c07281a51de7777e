//! Image upload handler

use crate::auth::AuthenticatedUser;
use crate::compress::compress_to_base64;
use crate::error::{AppError, Envelope, ImageEnvelope};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use quill_core::ImageRecord;
use std::sync::Arc;

const IMAGE_FIELD: &str = "image";

/// Multipart upload form
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImageUpload {
    /// Any format the decoder understands
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// Bytes of the first file part named `image`
///
/// A text part under that name counts as no file.
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if field.file_name().is_none() {
            break;
        }
        return Ok(field.bytes().await?);
    }
    Err(AppError::Validation("Invalid file".to_string()))
}

/// Upload an image
///
/// The image is resized to the configured width, re-encoded as JPEG and
/// stored base64 encoded. Sources or results over the configured size
/// limits are refused with 400.
#[utoipa::path(
    post,
    path = "/api/images",
    tag = "images",
    security(("bearer_cookie" = [])),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = ImageEnvelope),
        (status = 400, description = "Missing or undecodable image", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<Envelope<ImageRecord>>, AppError> {
    let bytes = read_image_field(&mut multipart).await?;
    let original_len = bytes.len();

    let upload = state.config.upload.clone();
    let encoded = tokio::task::spawn_blocking(move || compress_to_base64(&bytes, &upload))
        .await
        .map_err(|e| AppError::Internal(format!("Compression task failed: {e}")))??;

    let record = state.store.create_image(encoded).await?;

    tracing::info!(
        image_id = record.id,
        user = %user.username,
        original_bytes = original_len,
        stored_chars = record.image.len(),
        "Image uploaded"
    );

    Ok(Json(Envelope::ok(
        "File uploaded and compressed successfully",
        record,
    )))
}
