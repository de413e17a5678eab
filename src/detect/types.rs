use crate::image::ImageInfo;
use serde::Serialize;

/// 诊断结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    Pneumonia,
    Normal,
}

impl Diagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => "PNEUMONIA DETECTED",
            Diagnosis::Normal => "NORMAL",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Diagnosis::Pneumonia)
    }

    /// 随结果一起返回的就医建议
    pub fn recommendation(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => {
                "This analysis suggests pneumonia may be present. Immediate consultation \
                 with a healthcare professional is recommended."
            }
            Diagnosis::Normal => {
                "This X-ray does not show signs of pneumonia. However, continue monitoring \
                 your health and consult a doctor if symptoms persist."
            }
        }
    }
}

/// 单次预测：原始概率加派生的标签与置信度
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prediction {
    pub probability: f32,
    pub diagnosis: Diagnosis,
    pub confidence: f32,
}

impl Prediction {
    /// 固定0.5判定边界，严格大于：prob == 0.5 判为Normal
    pub fn from_probability(probability: f32) -> Self {
        let diagnosis = if probability > 0.5 {
            Diagnosis::Pneumonia
        } else {
            Diagnosis::Normal
        };
        let confidence = if probability > 0.5 {
            probability
        } else {
            1.0 - probability
        };

        Self {
            probability,
            diagnosis,
            confidence,
        }
    }

    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// 模型元信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub backbone: &'static str,
    pub runtime: &'static str,
    pub input_size: u32,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            backbone: "ResNet50",
            runtime: "onnxruntime",
            input_size: crate::image::preprocessing::IMAGE_SIZE,
        }
    }
}

/// 一次检测请求的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub prediction: Prediction,
    pub label: &'static str,
    pub recommendation: &'static str,
    pub image: ImageInfo,
    pub processing_time: f32,
    pub model_info: ModelInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_above_threshold_is_pneumonia() {
        let p = Prediction::from_probability(0.82);
        assert_eq!(p.diagnosis, Diagnosis::Pneumonia);
        assert!((p.confidence - 0.82).abs() < 1e-6);
        assert!((p.confidence_percent() - 82.0).abs() < 1e-4);
    }

    #[test]
    fn low_probability_is_normal_with_complement_confidence() {
        let p = Prediction::from_probability(0.1);
        assert_eq!(p.diagnosis, Diagnosis::Normal);
        assert!((p.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn exact_threshold_resolves_to_normal() {
        let p = Prediction::from_probability(0.5);
        assert_eq!(p.diagnosis, Diagnosis::Normal);
        assert_eq!(p.confidence, 0.5);
    }

    #[test]
    fn confidence_never_drops_below_half() {
        for i in 0..=100 {
            let p = Prediction::from_probability(i as f32 / 100.0);
            assert!(p.confidence >= 0.5 && p.confidence <= 1.0);
            assert_eq!(p.diagnosis.is_positive(), p.probability > 0.5);
        }
    }

    #[test]
    fn diagnosis_serializes_snake_case() {
        let json = serde_json::to_string(&Diagnosis::Pneumonia).unwrap();
        assert_eq!(json, "\"pneumonia\"");
    }
}
