use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 为空时允许任意来源
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    /// 临时文件目录, 为空时使用系统临时目录
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_attachment_bytes: usize,
}

// 启动日志会打印配置, 不能泄露密钥
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attachment_bytes", &self.max_attachment_bytes)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            cors: CorsConfig::default(),
            upload: UploadConfig {
                max_bytes: 20 * 1024 * 1024,
                temp_dir: None,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                timeout_secs: 60,
                max_attachment_bytes: 100 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    ///
    /// 形如 `APP__SERVER__PORT=9000` 的变量覆盖默认值;
    /// 密钥读取 `OPENAI_API_KEY`, 其次 `AIPROXY_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("AIPROXY_TOKEN"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("upload.max_bytes", defaults.upload.max_bytes as i64)?
            .set_default("llm.base_url", defaults.llm.base_url)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default("llm.timeout_secs", defaults.llm.timeout_secs as i64)?
            .set_default(
                "llm.max_attachment_bytes",
                defaults.llm.max_attachment_bytes as i64,
            )?
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("llm.api_key", api_key)?
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
