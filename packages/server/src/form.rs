//! Reading the `POST /map_data` multipart form.
//!
//! The form carries two fields: `data` (annotation JSON as text) and
//! `image` (the photo file). Other fields are skipped.

use actix_multipart::{Field, Multipart};
use building_survey_annotation::ImageUpload;
use futures::StreamExt as _;

use crate::error::ApiError;

/// Name of the annotation JSON field.
pub const DATA_FIELD: &str = "data";

/// Name of the photo field.
pub const IMAGE_FIELD: &str = "image";

/// Size limit for the annotation JSON field.
pub const MAX_DATA_BYTES: usize = 256 * 1024;

/// Fields read from the form; either may be absent.
#[derive(Debug, Default)]
pub struct RawSubmission {
    /// Annotation JSON text.
    pub data: Option<String>,
    /// Uploaded photo.
    pub image: Option<ImageUpload>,
}

/// Reads the submission form, enforcing `max_image_bytes` on the photo.
///
/// # Errors
///
/// Returns [`ApiError::Multipart`] if the body is not valid multipart or
/// `data` is not UTF-8, and [`ApiError::PayloadTooLarge`] if a field is
/// over its limit.
pub async fn read_submission(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<RawSubmission, ApiError> {
    let mut submission = RawSubmission::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::Multipart(e.to_string()))?;

        let disposition = field.content_disposition();
        let name = disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        let filename = disposition
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            DATA_FIELD => {
                let bytes = read_field(&mut field, DATA_FIELD, MAX_DATA_BYTES).await?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    ApiError::Multipart(format!("field `{DATA_FIELD}` is not valid UTF-8"))
                })?;
                submission.data = Some(text);
            }
            IMAGE_FIELD => {
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = read_field(&mut field, IMAGE_FIELD, max_image_bytes).await?;
                submission.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            other => {
                log::debug!("Skipping unexpected form field {other:?}");
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
                }
            }
        }
    }

    Ok(submission)
}

/// Collects a field's chunks, failing once more than `limit` bytes arrive.
async fn read_field(
    field: &mut Field,
    name: &'static str,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
        if bytes.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge { field: name, limit });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
