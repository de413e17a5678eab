use crate::utils::error::DetectError;
use crate::Result;
use image::{imageops, DynamicImage, GrayImage, Luma};
use ndarray::Array4;

/// 分类模型的输入边长
pub const IMAGE_SIZE: u32 = 224;

/// ImageNet通道均值，BGR顺序（ResNet50 caffe预处理）
pub const BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 把任意尺寸的上传图像转换为分类器输入张量 (1, 224, 224, 3)
    ///
    /// 处理顺序必须与模型训练时保持一致：
    /// 1. BT.601亮度转灰度
    /// 2. Catmull-Rom三次插值缩放到224x224（不保持宽高比）
    /// 3. 灰度通道复制为3通道
    /// 4. BGR排序减去ImageNet均值，不做缩放
    /// 5. 添加batch维度
    pub fn preprocess(image: &DynamicImage) -> Result<Array4<f32>> {
        let gray = Self::to_grayscale(image)?;
        let resized = imageops::resize(
            &gray,
            IMAGE_SIZE,
            IMAGE_SIZE,
            imageops::FilterType::CatmullRom,
        );
        Ok(Self::normalize(&resized))
    }

    /// ITU-R BT.601亮度转换: L = round((299*R + 587*G + 114*B) / 1000)
    ///
    /// `image` crate自带的to_luma8用BT.709权重，和训练端不一致，
    /// 这里显式按601权重计算。灰度源经to_rgb8三通道相等，逐像素还原无损。
    fn to_grayscale(image: &DynamicImage) -> Result<GrayImage> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::Preprocess("empty image".to_string()));
        }

        let mut gray = GrayImage::new(width, height);
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
            gray.put_pixel(x, y, Luma([luma as u8]));
        }
        Ok(gray)
    }

    /// 单通道复制为3通道并做caffe式均值中心化，输出NHWC张量
    fn normalize(gray: &GrayImage) -> Array4<f32> {
        let size = IMAGE_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, size, size, 3));

        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = pixel.0[0] as f32;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = value - BGR_MEAN[c];
            }
        }

        tensor
    }
}
