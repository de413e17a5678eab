pub mod handlers;
pub mod ui;

use crate::{models::ModelManager, Config, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

pub async fn serve(config: Config) -> Result<()> {
    // 初始化模型管理器；加载失败不阻止启动，检测接口会持续报告该错误
    ModelManager::init(config.clone())?;

    // 构建应用路由
    let app = create_app(config.clone()).await?;

    // 解析绑定地址
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        crate::utils::error::DetectError::Config(format!(
            "Invalid bind address {}: {}",
            config.bind_addr, e
        ))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /analyze        - JSON base64 upload");
    tracing::info!("  POST /analyze/upload - Multipart file upload");
    tracing::info!("  GET  /               - Web UI");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("  GET  /api/info       - Service information");

    // 启动服务器
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        crate::utils::error::DetectError::Internal(format!(
            "Failed to bind to address {}: {}",
            addr, e
        ))
    })?;

    axum::serve(listener, app).await.map_err(|e| {
        crate::utils::error::DetectError::Internal(format!("Server failed to start: {}", e))
    })?;

    Ok(())
}

async fn create_app(config: Config) -> Result<Router> {
    let app = Router::new()
        // 检测API路由
        .route("/analyze", post(handlers::analyze_json_handler))
        .route("/analyze/upload", post(handlers::analyze_upload_handler))
        // Web UI路由
        .route("/", get(ui::index_handler))
        // 系统路由
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        // 添加中间件 - 使用分层模式避免复杂类型嵌套
        // DefaultBodyLimit保证multipart请求也受配置的上限约束
        .layer(DefaultBodyLimit::max(config.server_config.max_request_size))
        .layer(RequestBodyLimitLayer::new(config.server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server_config.request_timeout,
        )))
        .layer(CorsLayer::permissive()) // 开发环境使用宽松CORS
        // 传递配置到处理器
        .with_state(config);

    Ok(app)
}

/// 健康检查端点；模型不可用时返回503，页面本身仍可访问
async fn health_handler() -> Result<Json<serde_json::Value>> {
    crate::models::health_check()?;
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler() -> Result<Json<serde_json::Value>> {
    let stats = crate::models::get_model_stats()?;
    Ok(Json(json!({
        "service": "PneumoDetect",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "features": {
            "dual_upload_modes": true,
            "accepted_formats": ["jpg", "jpeg", "png"],
            "educational_pages": true,
            "detection_available": stats.model_loaded
        }
    })))
}
