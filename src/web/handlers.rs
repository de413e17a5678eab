use crate::{
    detect::{DetectPipeline, DetectionResult},
    utils::error::DetectError,
    Config, Result,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct AnalyzeJsonRequest {
    /// Base64编码的图像数据，允许带data URL前缀
    pub image: String,

    /// 原始文件名，仅用于结果展示
    #[serde(default)]
    pub filename: Option<String>,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn error(code: String, message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError { code, message }),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// JSON base64上传处理器
pub async fn analyze_json_handler(
    State(_config): State<Config>,
    Json(request): Json<AnalyzeJsonRequest>,
) -> Result<Json<ApiResponse<DetectionResult>>> {
    let start_time = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        "Processing JSON analyze request: request_id={}, filename={:?}",
        request_id,
        request.filename
    );

    // 验证请求参数
    if request.image.is_empty() {
        return Err(DetectError::InvalidInput("Empty image data".to_string()));
    }

    // 执行检测流水线
    let result = DetectPipeline::process_base64(&request.image, request.filename).await?;

    tracing::info!(
        "JSON analyze completed: request_id={}, diagnosis={}, time={:.3}s",
        request_id,
        result.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result)))
}

/// Multipart文件上传处理器
pub async fn analyze_upload_handler(
    State(_config): State<Config>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<DetectionResult>>> {
    let start_time = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!("Processing multipart analyze request: request_id={}", request_id);

    let mut image_data: Option<axum::body::Bytes> = None;
    let mut filename: Option<String> = None;

    // 解析multipart数据
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        DetectError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                // 验证内容类型
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(DetectError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                filename = field.file_name().map(|s| s.to_string());

                // 读取文件数据
                let data = field.bytes().await.map_err(|e| {
                    DetectError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(DetectError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    // 验证必需的图像数据
    let image_data = image_data
        .ok_or_else(|| DetectError::InvalidInput("No image file provided".to_string()))?;

    // 执行检测流水线
    let result = DetectPipeline::process_bytes(image_data, filename).await?;

    tracing::info!(
        "Upload analyze completed: request_id={}, diagnosis={}, time={:.3}s",
        request_id,
        result.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data_and_request_id() {
        let resp = ApiResponse::success(42u32);
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
        assert!(resp.error.is_none());
        assert!(uuid::Uuid::parse_str(&resp.request_id).is_ok());
    }

    #[test]
    fn error_envelope_has_no_data() {
        let resp = ApiResponse::<()>::error("INVALID_INPUT".into(), "Empty file".into());
        assert!(!resp.success);
        assert!(resp.data.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, "INVALID_INPUT");
    }
}
