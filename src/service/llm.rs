use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::service::hasher::hash_bytes;
use crate::service::upload::StagedUpload;

const SYSTEM_PROMPT: &str = "You answer course assignment questions. \
Reply with the final answer only, without explanation or formatting, \
unless the question explicitly asks for more.";

/// 大模型客户端接口
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn answer(&self, question: &str, attachment: Option<&StagedUpload>) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 附件内容: 较小的 UTF-8 文本直接内嵌, 否则只给出文件摘要
pub fn describe_attachment(file_name: &str, bytes: &[u8], max_inline_bytes: usize) -> String {
    if bytes.len() <= max_inline_bytes {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return format!("Attached file `{file_name}`:\n```\n{text}\n```");
        }
    }
    format!(
        "Attached file `{}` ({} bytes, sha256 {}) is binary or too large to include inline.",
        file_name,
        bytes.len(),
        hash_bytes(bytes)
    )
}

pub fn build_messages(question: &str, attachment: Option<String>) -> Vec<ChatMessage> {
    let content = match attachment {
        Some(extra) => format!("{question}\n\n{extra}"),
        None => question.to_string(),
    };
    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage { role: "user", content },
    ]
}

/// OpenAI 兼容的 chat completions 客户端
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_attachment_bytes: usize,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_attachment_bytes: config.max_attachment_bytes,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn answer(&self, question: &str, attachment: Option<&StagedUpload>) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let extra = match attachment {
            Some(upload) => {
                let bytes = tokio::fs::read(upload.path()).await?;
                Some(describe_attachment(upload.file_name(), &bytes, self.max_attachment_bytes))
            }
            None => None,
        };
        let messages = build_messages(question, extra);

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: &messages,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), elapsed = ?start.elapsed(), "大模型请求失败");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        tracing::info!(model = %self.model, elapsed = ?start.elapsed(), "大模型请求完成");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(LlmError::EmptyAnswer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn small_text_is_inlined() {
        let text = describe_attachment("notes.md", b"# Title\nbody", 1024);
        assert!(text.starts_with("Attached file `notes.md`:"));
        assert!(text.contains("# Title\nbody"));
    }

    #[test]
    fn binary_or_large_files_are_summarized() {
        let binary = describe_attachment("img.png", &[0xff, 0xfe, 0x00], 1024);
        assert!(binary.contains("3 bytes"));
        assert!(binary.contains("sha256"));

        let large = describe_attachment("big.txt", b"hello world", 4);
        assert!(large.contains("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"));
    }

    #[test]
    fn messages_carry_system_prompt_and_question() {
        let messages = build_messages("What is 2+2?", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "What is 2+2?");

        let with_file = build_messages("Sum it", Some("Attached file `a.csv`".to_string()));
        assert_eq!(with_file[1].content, "Sum it\n\nAttached file `a.csv`");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let mut config = AppConfig::default().llm;
        config.base_url = "http://localhost:1234/v1/".to_string();
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:1234/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(&AppConfig::default().llm).unwrap();
        let err = client.answer("hi", None).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
