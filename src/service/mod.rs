pub mod aggregator;
pub mod hasher;
pub mod llm;
pub mod phonetic;
pub mod upload;

pub use aggregator::{aggregate, aggregate_records, aggregate_with_summary, AggregateSummary};
pub use hasher::hash_file;
pub use llm::{LlmClient, OpenAiClient};
pub use phonetic::{normalize_name, ProductMatcher};
pub use upload::{StagedUpload, UploadStager};
