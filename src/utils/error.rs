use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DetectError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            DetectError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DetectError::Base64(_) => StatusCode::BAD_REQUEST,
            DetectError::Json(_) => StatusCode::BAD_REQUEST,
            DetectError::ImageDecode(_) => StatusCode::BAD_REQUEST,
            DetectError::Preprocess(_) => StatusCode::BAD_REQUEST,
            DetectError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            DetectError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DetectError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DetectError::Preprocess(_) => "PREPROCESS_ERROR",
            DetectError::Inference(_) => "INFERENCE_ERROR",
            DetectError::InvalidInput(_) => "INVALID_INPUT",
            DetectError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DetectError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DetectError::Config(_) => "CONFIG_ERROR",
            DetectError::Io(_) => "IO_ERROR",
            DetectError::Json(_) => "JSON_ERROR",
            DetectError::Base64(_) => "BASE64_DECODE_ERROR",
            DetectError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DetectError::Ort(_) => "ORT_ERROR",
            DetectError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        tracing::error!("Request failed: {} ({})", self, status);

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_errors_are_client_errors() {
        let err = DetectError::Preprocess("cannot decode".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "PREPROCESS_ERROR");
    }

    #[test]
    fn model_load_maps_to_service_unavailable() {
        let err = DetectError::ModelLoad("missing artifact".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }
}
