use crate::utils::error::DetectError;
use crate::Result;
use axum::body::Bytes;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;

/// 上传文件大小上限
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20MB

/// 上传图像的展示元数据
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImageInfo {
    pub fn new(image: &DynamicImage, format: Option<ImageFormat>, filename: Option<String>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            filename: filename.unwrap_or_else(|| "upload".to_string()),
            width,
            height,
            format: format
                .map(|f| format!("{:?}", f).to_uppercase())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        }
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// 从base64字符串加载图像
    pub fn from_base64(base64_data: &str) -> Result<(DynamicImage, Option<ImageFormat>)> {
        // 检测并移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        // 解码base64
        let image_bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_clean)
            .map_err(DetectError::Base64)?;

        Self::decode(&image_bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(bytes: Bytes) -> Result<(DynamicImage, Option<ImageFormat>)> {
        Self::decode(&bytes)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: &str) -> Result<(DynamicImage, Option<ImageFormat>)> {
        let bytes = std::fs::read(path).map_err(DetectError::Io)?;
        Self::decode(&bytes)
    }

    fn decode(bytes: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>)> {
        // 检查文件大小
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(DetectError::FileTooLarge(bytes.len(), MAX_UPLOAD_BYTES));
        }

        // 检查图像格式，只接受JPEG/PNG
        let format = Self::detect_format(bytes);
        if let Some(format) = format {
            if !Self::is_supported_format(format) {
                return Err(DetectError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        // 解码图像；截断或损坏的文件在这里报错
        let image = image::load_from_memory(bytes).map_err(DetectError::ImageDecode)?;

        Ok((image, format))
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(format, ImageFormat::Png | ImageFormat::Jpeg)
    }
}
