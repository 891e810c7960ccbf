use answer_api_rust::{build_router, AppConfig, AppState, OpenAiClient, UploadStager};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式, 默认 info 级别
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);
    if config.llm.api_key.is_none() {
        warn!("未配置 OPENAI_API_KEY / AIPROXY_TOKEN, /api/ 将返回错误");
    }

    // 创建服务
    let state = AppState {
        llm: Arc::new(OpenAiClient::new(&config.llm)?),
        uploads: Arc::new(UploadStager::new(config.upload.temp_dir.clone())),
    };

    // 构建路由
    let app = build_router(state, &config);

    // 启动服务器
    let addr = config.bind_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /                       - welcome");
    info!("  POST /api/                   - question (+ file) -> answer");
    info!("  POST /debug/{{function_name}}  - call a helper directly");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
