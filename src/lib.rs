pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod source;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use error::{AnalysisError, LlmError};
pub use service::{aggregate, hash_file, OpenAiClient, UploadStager};
