use crate::{
    detect::{DetectionResult, ModelInfo, Prediction},
    image::{ImageInfo, ImageLoader, ImagePreprocessor},
    models::get_classifier,
    Result,
};
use image::DynamicImage;
use std::time::Instant;

/// 检测流水线：解码 → 预处理 → 推理 → 标签
///
/// 每次请求完整重跑，不缓存任何历史结果
pub struct DetectPipeline;

impl DetectPipeline {
    /// 处理base64图像
    pub async fn process_base64(
        base64_data: &str,
        filename: Option<String>,
    ) -> Result<DetectionResult> {
        let start_time = Instant::now();

        let (image, format) = ImageLoader::from_base64(base64_data)?;
        let info = ImageInfo::new(&image, format, filename);

        Self::process_image(image, info, start_time).await
    }

    /// 处理字节流图像
    pub async fn process_bytes(
        bytes: axum::body::Bytes,
        filename: Option<String>,
    ) -> Result<DetectionResult> {
        let start_time = Instant::now();

        let (image, format) = ImageLoader::from_bytes(bytes)?;
        let info = ImageInfo::new(&image, format, filename);

        Self::process_image(image, info, start_time).await
    }

    /// 核心流水线
    async fn process_image(
        image: DynamicImage,
        info: ImageInfo,
        start_time: Instant,
    ) -> Result<DetectionResult> {
        let tensor = ImagePreprocessor::preprocess(&image)?;

        let classifier = get_classifier()?;
        let probability = classifier.predict(tensor)?;

        let prediction = Prediction::from_probability(probability);
        let total_time = start_time.elapsed();

        tracing::info!(
            "Detection completed: file={}, diagnosis={}, confidence={:.1}%, time={:.3}s",
            info.filename,
            prediction.diagnosis.as_str(),
            prediction.confidence_percent(),
            total_time.as_secs_f32()
        );

        Ok(DetectionResult {
            prediction,
            label: prediction.diagnosis.as_str(),
            recommendation: prediction.diagnosis.recommendation(),
            image: info,
            processing_time: total_time.as_secs_f32(),
            model_info: ModelInfo::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::DetectError;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(150, 150, image::Rgb([90, 90, 90])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn undecodable_input_fails_before_inference() {
        let err = DetectPipeline::process_bytes(axum::body::Bytes::from_static(b"\x89PNG\r\n\x1a\nbroken"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ImageDecode(_)));
    }

    #[tokio::test]
    async fn invalid_base64_fails_before_inference() {
        let err = DetectPipeline::process_base64("%%%", None).await.unwrap_err();
        assert!(matches!(err, DetectError::Base64(_)));
    }

    #[tokio::test]
    async fn missing_model_surfaces_after_successful_decode() {
        // 没有可用模型时解码与预处理照常完成，错误来自模型侧；
        // 取决于同进程其它测试是否已初始化全局管理器，错误要么是
        // 未初始化，要么是缓存的加载失败
        let err = DetectPipeline::process_bytes(axum::body::Bytes::from(png_bytes()), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DetectError::Internal(_) | DetectError::ModelLoad(_)
        ));
    }
}
