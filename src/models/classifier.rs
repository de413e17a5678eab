use crate::utils::error::DetectError;
use crate::{Config, Result};
use ndarray::Array4;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// 肺炎二分类器，封装单个ONNX会话
#[derive(Debug)]
pub struct Classifier {
    session: Arc<Mutex<Session>>,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.model_path();

        if !model_path.exists() {
            return Err(DetectError::ModelLoad(format!(
                "Pneumonia model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading pneumonia model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(&model_path)?;

        if session.inputs.is_empty() {
            return Err(DetectError::ModelLoad(
                "Pneumonia model has no inputs".to_string(),
            ));
        }
        if session.outputs.is_empty() {
            return Err(DetectError::ModelLoad(
                "Pneumonia model has no outputs".to_string(),
            ));
        }

        // 动态发现输入输出名称
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();
        tracing::info!(
            "Pneumonia model input: '{}', output: '{}'",
            input_name,
            output_name
        );

        // 记录所有可用输出用于调试
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Model output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    /// 单张推理，返回肺炎概率（同步阻塞，不做跨请求批处理）
    pub fn predict(&self, tensor: Array4<f32>) -> Result<f32> {
        let input_tensor = Tensor::from_array(tensor)?;

        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    // 提供详细的错误诊断信息
                    let available: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(DetectError::Inference(format!(
                        "Model output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        Self::extract_probability(&predictions.view())
    }

    /// 解析模型输出，接受 (1, 1) 或 (1,) 形状的单标量
    fn extract_probability(predictions: &ndarray::ArrayViewD<f32>) -> Result<f32> {
        if predictions.len() != 1 {
            return Err(DetectError::Inference(format!(
                "Expected a single scalar probability, got output shape {:?}",
                predictions.shape()
            )));
        }

        let prob = predictions
            .iter()
            .copied()
            .next()
            .ok_or_else(|| DetectError::Inference("Empty model output".to_string()))?;

        // sigmoid输出允许有极小的数值溢出
        Ok(prob.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn scalar_output_shapes_are_accepted() {
        for shape in [vec![1, 1], vec![1]] {
            let out = ArrayD::from_elem(IxDyn(&shape), 0.82f32);
            let prob = Classifier::extract_probability(&out.view()).unwrap();
            assert!((prob - 0.82).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn multi_class_output_is_rejected() {
        let out = ArrayD::from_elem(IxDyn(&[1, 2]), 0.5f32);
        let err = Classifier::extract_probability(&out.view()).unwrap_err();
        assert!(matches!(err, DetectError::Inference(_)));
    }

    #[test]
    fn numeric_overflow_is_clamped_to_unit_interval() {
        let out = ArrayD::from_elem(IxDyn(&[1, 1]), 1.0000002f32);
        let prob = Classifier::extract_probability(&out.view()).unwrap();
        assert_eq!(prob, 1.0);
    }

    #[test]
    fn missing_model_file_is_a_load_error() {
        let config = Config::new(
            "127.0.0.1:8501".into(),
            "/nonexistent/models".into(),
            None,
            false,
        )
        .unwrap();
        let err = Classifier::new(&config).unwrap_err();
        assert!(matches!(err, DetectError::ModelLoad(_)));
    }
}
