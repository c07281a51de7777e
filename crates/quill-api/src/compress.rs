//! Upload compression
//!
//! Decodes any supported format, scales to a fixed width keeping the aspect
//! ratio, and re-encodes as JPEG.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageReader, Limits};
use quill_core::{QuillError, UploadConfig};
use std::io::Cursor;

/// Ceiling on decoder allocations
const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Output size for a `src_w` x `src_h` source scaled to `width`
///
/// The height is rounded and kept at one pixel or more. Results above
/// `max_pixels` are rejected before any pixel buffer is allocated.
pub fn target_dimensions(
    src_w: u32,
    src_h: u32,
    width: u32,
    max_pixels: u64,
) -> Result<(u32, u32), QuillError> {
    if src_w == 0 || src_h == 0 {
        return Err(QuillError::Image("Image has no pixels".to_string()));
    }

    let (src_w, src_h, width64) = (u64::from(src_w), u64::from(src_h), u64::from(width));
    let height = ((src_h * width64 + src_w / 2) / src_w).max(1);

    let too_large = || {
        QuillError::Image(format!(
            "Image too large: resizing gives {width}x{height}, limit is {max_pixels} pixels"
        ))
    };
    if width64.saturating_mul(height) > max_pixels {
        return Err(too_large());
    }
    let height = u32::try_from(height).map_err(|_| too_large())?;

    Ok((width, height))
}

fn decode(bytes: &[u8], max_dimension: u32) -> Result<image::DynamicImage, QuillError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| QuillError::Image(format!("Unreadable upload: {e}")))?;
    reader.limits(limits);

    reader
        .decode()
        .map_err(|e| QuillError::Image(format!("Unsupported or corrupt image: {e}")))
}

/// Resize `bytes` to the configured width and encode as JPEG
///
/// Smaller images are scaled up, matching the upload contract of a fixed
/// output width.
pub fn compress_image(bytes: &[u8], upload: &UploadConfig) -> Result<Vec<u8>, QuillError> {
    let img = decode(bytes, upload.max_input_dimension)?;

    let (width, height) = target_dimensions(
        img.width(),
        img.height(),
        upload.resize_width,
        upload.max_output_pixels,
    )?;

    let rgb = img
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, upload.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|e| QuillError::Image(format!("JPEG encoding failed: {e}")))?;

    Ok(out)
}

/// Compress and base64-encode, ready for storage
pub fn compress_to_base64(bytes: &[u8], upload: &UploadConfig) -> Result<String, QuillError> {
    let jpeg = compress_image(bytes, upload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(jpeg))
}
