//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Everything a request handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File too large. Maximum size is {}", size_label(.max_bytes))]
    FileTooLarge { max_bytes: usize },

    #[error("{0}")]
    BadRequest(String),

    #[error("Model is still loading. Please try again in a moment.")]
    ModelLoading,

    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Processing(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFile
            | Self::EmptyFilename
            | Self::EmptyFile
            | Self::FileTooLarge { .. }
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ModelLoading | Self::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoFile | Self::EmptyFilename | Self::EmptyFile | Self::BadRequest(_) => {
                "bad_request"
            }
            Self::FileTooLarge { .. } => "too_large",
            Self::ModelLoading => "model_loading",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Processing(_) => "processing_error",
        }
    }
}

impl From<pawprint_core::Error> for ApiError {
    fn from(err: pawprint_core::Error) -> Self {
        use pawprint_core::Error;

        match err {
            Error::InvalidInput(msg) => Self::BadRequest(msg),
            Error::ModelUnavailable(msg) => Self::ModelUnavailable(msg),
            other => Self::Processing(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::ModelLoading => json!({ "error": self.to_string(), "model_loading": true }),
            Self::ModelUnavailable(_) => {
                json!({ "error": self.to_string(), "model_loading": false })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// `10485760` -> `"10MB"`, `1572864` -> `"1.5MB"`, `2048` -> `"2KB"`
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;

    if bytes >= MB {
        trim_unit(bytes as f64 / MB as f64, "MB")
    } else if bytes >= KB {
        trim_unit(bytes as f64 / KB as f64, "KB")
    } else {
        format!("{} bytes", bytes)
    }
}

fn size_label(bytes: &usize) -> String {
    format_size(*bytes)
}

fn trim_unit(value: f64, unit: &str) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}{}", rounded as u64, unit)
    } else {
        format!("{:.1}{}", rounded, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(10 * 1024 * 1024), "10MB");
        assert_eq!(format_size(1024 * 1024 + 512 * 1024), "1.5MB");
        assert_eq!(format_size(2048), "2KB");
        assert_eq!(format_size(100), "100 bytes");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::FileTooLarge { max_bytes: 10 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::ModelLoading.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Processing("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let decode: ApiError = pawprint_core::Error::decode("bad header").into();
        assert_eq!(decode.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(decode.to_string().contains("bad header"));

        let input: ApiError = pawprint_core::Error::invalid_input("nope").into();
        assert_eq!(input.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_too_large_message() {
        let err = ApiError::FileTooLarge { max_bytes: 10 * 1024 * 1024 };
        assert_eq!(err.to_string(), "File too large. Maximum size is 10MB");
    }
}
