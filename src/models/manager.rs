use crate::models::Classifier;
use crate::utils::error::DetectError;
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// 全局模型管理器单例
///
/// 模型在进程启动时加载一次，之后所有请求共享同一个句柄。
/// 加载失败的结果同样被缓存：检测接口每次都返回同一个错误，
/// 不自动重试，其余页面不受影响。
pub struct ModelManager {
    classifier: std::result::Result<Arc<Classifier>, String>,
    config: Config,
}

static MODEL_MANAGER: OnceCell<Arc<Mutex<ModelManager>>> = OnceCell::new();

impl ModelManager {
    /// 初始化全局模型管理器，服务启动时调用一次
    pub fn init(config: Config) -> Result<()> {
        tracing::info!("Initializing model manager...");

        let manager = Self::load(config);

        MODEL_MANAGER
            .set(Arc::new(Mutex::new(manager)))
            .map_err(|_| {
                DetectError::Internal("Model manager already initialized".to_string())
            })?;

        tracing::info!("Model manager initialized");
        Ok(())
    }

    /// 加载模型并缓存结果；失败不向上传播，留给检测请求逐次报告
    fn load(config: Config) -> ModelManager {
        let classifier = match Classifier::new(&config) {
            Ok(cls) => {
                tracing::info!("Pneumonia model loaded successfully");
                Ok(Arc::new(cls))
            }
            Err(e) => {
                tracing::error!("Failed to load pneumonia model: {}", e);
                Err(e.to_string())
            }
        };

        ModelManager { classifier, config }
    }

    /// 获取全局模型管理器实例
    pub fn instance() -> Result<Arc<Mutex<ModelManager>>> {
        MODEL_MANAGER
            .get()
            .cloned()
            .ok_or_else(|| DetectError::Internal("Model manager not initialized".to_string()))
    }

    /// 获取分类器引用；启动时加载失败则返回缓存的错误
    pub fn classifier(&self) -> Result<Arc<Classifier>> {
        self.classifier
            .as_ref()
            .map(Arc::clone)
            .map_err(|msg| DetectError::ModelLoad(msg.clone()))
    }

    /// 检测功能是否可用
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_ok()
    }

    /// 获取配置引用
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 模型健康检查
    pub fn health_check(&self) -> Result<()> {
        tracing::debug!("Performing model health check...");
        self.classifier()?;
        tracing::debug!("Model health check passed");
        Ok(())
    }

    /// 获取模型统计信息
    pub fn get_stats(&self) -> ModelStats {
        ModelStats {
            model_loaded: self.has_classifier(),
            model_path: self.config.model_path().display().to_string(),
            intra_threads: self.config.onnx_config.intra_threads,
            optimization_level: self.config.onnx_config.optimization_level,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub model_loaded: bool,
    pub model_path: String,
    pub intra_threads: usize,
    pub optimization_level: i32,
}

/// 便捷函数：获取分类器
pub fn get_classifier() -> Result<Arc<Classifier>> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    guard.classifier()
}

/// 便捷函数：检查模型健康状态
pub fn health_check() -> Result<()> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    guard.health_check()
}

/// 便捷函数：获取模型统计信息
pub fn get_model_stats() -> Result<ModelStats> {
    let manager = ModelManager::instance()?;
    let guard = manager.lock();
    Ok(guard.get_stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_model_config() -> Config {
        Config::new(
            "127.0.0.1:8501".into(),
            "/nonexistent/models".into(),
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn load_failure_is_cached_without_retry() {
        let manager = ModelManager::load(missing_model_config());
        assert!(!manager.has_classifier());

        // 同一个缓存错误被重复返回，不会重新读取模型文件
        let first = manager.classifier().unwrap_err();
        let second = manager.classifier().unwrap_err();
        assert!(matches!(first, DetectError::ModelLoad(_)));
        assert_eq!(first.to_string(), second.to_string());

        assert!(matches!(
            manager.health_check().unwrap_err(),
            DetectError::ModelLoad(_)
        ));
        assert!(!manager.get_stats().model_loaded);
    }

    #[test]
    fn global_init_happens_at_most_once() {
        // 这是唯一触碰全局单例的测试，自成一体避免顺序依赖
        ModelManager::init(missing_model_config()).unwrap();

        let err = get_classifier().unwrap_err();
        assert!(matches!(err, DetectError::ModelLoad(_)));

        // 第二次init被拒绝，已缓存的结果保持不变
        let reinit = ModelManager::init(missing_model_config()).unwrap_err();
        assert!(matches!(reinit, DetectError::Internal(_)));
        assert!(matches!(
            get_classifier().unwrap_err(),
            DetectError::ModelLoad(_)
        ));
    }
}
