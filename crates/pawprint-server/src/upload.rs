//! Multipart upload extraction

use crate::error::ApiError;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// A single uploaded image
#[derive(Debug, Clone)]
pub struct Upload {
    /// Multipart field the file arrived in
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Pull the image upload out of a multipart body.
///
/// The first field named in `fields` that carries a filename is the upload.
/// Fields without a filename are plain form values and are skipped. The
/// size limit is enforced chunk by chunk so an oversized body is rejected
/// before it is fully buffered.
pub async fn read_upload(
    multipart: &mut Multipart,
    fields: &[String],
    max_bytes: usize,
) -> Result<Upload, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if !fields.iter().any(|f| f == &name) {
            debug!(field = %name, "Skipping multipart field");
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if filename.trim().is_empty() {
            return Err(ApiError::EmptyFilename);
        }
        let content_type = field.content_type().map(str::to_owned);

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::FileTooLarge { max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(ApiError::EmptyFile);
        }

        return Ok(Upload {
            field: name,
            filename,
            content_type,
            data: data.freeze(),
        });
    }

    Err(ApiError::NoFile)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge { max_bytes }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
