pub mod debug;
pub mod form;
pub mod handlers;

pub use debug::debug_function;
pub use handlers::{ask, health_check, root};

use crate::config::{AppConfig, CorsConfig};
use crate::service::{LlmClient, UploadStager};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 共享状态: 大模型客户端 + 上传暂存
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmClient>,
    pub uploads: Arc<UploadStager>,
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("忽略无效的 CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// 构建路由
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/", post(ask))
        .route("/api", post(ask))
        .route("/debug/:function_name", post(debug_function))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors))
                .layer(DefaultBodyLimit::max(config.upload.max_bytes)),
        )
}
