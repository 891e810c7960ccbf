use std::path::PathBuf;

use thiserror::Error;

/// 销售聚合 / 文件哈希的错误类型
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("file not found or unreadable: {path}: {reason}")]
    NotFound { path: PathBuf, reason: String },
    #[error("schema error: {0}")]
    Schema(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("compute error: {0}")]
    Compute(String),
}

impl AnalysisError {
    pub fn not_found(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::NotFound {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// 大模型调用的错误类型
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured (set OPENAI_API_KEY or AIPROXY_TOKEN)")]
    MissingApiKey,
    #[error("request to language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("language model returned an empty answer")]
    EmptyAnswer,
    #[error("failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}
