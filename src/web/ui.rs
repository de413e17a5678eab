use axum::response::{Html, IntoResponse};

/// 首页处理器，返回编译期嵌入的单页UI
pub async fn index_handler() -> impl IntoResponse {
    let html = include_str!("../../templates/index.html");
    Html(html)
}
