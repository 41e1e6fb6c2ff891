//! Image uploads to S3-compatible object storage (MinIO locally, AWS in production).

use aws_sdk_s3::primitives::ByteStream;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const UPLOAD_FIELD: &str = "file";

#[derive(Debug)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Bytes,
}

/// File extension for the accepted image content types.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Pulls the `file` field out of a multipart body and checks type and size.
pub async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if image_extension(&content_type).is_none() {
            return Err(AppError::Validation(format!(
                "Unsupported image type '{content_type}'"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        check_upload_size(bytes.len())?;

        return Ok(ImageUpload {
            content_type,
            bytes,
        });
    }

    Err(AppError::Validation(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

pub fn check_upload_size(len: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "Uploaded file exceeds {} MiB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Stores the image under `{prefix}/{uuid}.{ext}` and returns its public URL.
pub async fn store_image(
    state: &AppState,
    prefix: &str,
    upload: ImageUpload,
) -> Result<String, AppError> {
    let extension = image_extension(&upload.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", prefix.trim_matches('/'), Uuid::new_v4(), extension);

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&key)
        .body(ByteStream::from(upload.bytes))
        .content_type(&upload.content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Upload failed: {e}")))?;

    info!("Uploaded s3://{}/{}", state.config.s3_bucket, key);
    Ok(state.config.public_object_url(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_image_types() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn test_upload_size_limits() {
        assert!(check_upload_size(0).is_err());
        assert!(check_upload_size(1024).is_ok());
        assert!(check_upload_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(check_upload_size(MAX_UPLOAD_BYTES + 1).is_err());
    }
}
