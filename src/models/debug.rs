use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::error::AnalysisError;
use crate::models::query::AggregateParams;

/// 调试接口可直接调用的函数 (封闭集合)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOperation {
    AnalyzeSales,
    HashFile,
}

/// 哈希函数不接受任何参数, 文件必须通过上传提供
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashParams {}

/// 解析完参数的调用
#[derive(Debug, Clone)]
pub enum DebugCall {
    AnalyzeSales(AggregateParams),
    HashFile(HashParams),
}

fn registry() -> &'static IndexMap<&'static str, DebugOperation> {
    static REGISTRY: OnceLock<IndexMap<&'static str, DebugOperation>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut table = IndexMap::new();
        for op in [DebugOperation::AnalyzeSales, DebugOperation::HashFile] {
            table.insert(op.name(), op);
        }
        table
    })
}

impl DebugOperation {
    pub fn name(self) -> &'static str {
        match self {
            Self::AnalyzeSales => "analyze_sales_with_phonetic_clustering",
            Self::HashFile => "calculate_prettier_sha256",
        }
    }

    /// 按路径中的函数名查表, 未登记的名字返回 None
    pub fn lookup(name: &str) -> Option<Self> {
        registry().get(name).copied()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        registry().keys().copied()
    }

    /// 按该函数声明的参数结构解析 params JSON
    pub fn parse_params(self, raw: &str) -> Result<DebugCall, AnalysisError> {
        let raw = if raw.trim().is_empty() { "{}" } else { raw };
        let invalid = |e: serde_json::Error| {
            AnalysisError::Validation(format!("invalid params for {}: {}", self.name(), e))
        };
        match self {
            Self::AnalyzeSales => serde_json::from_str(raw).map(DebugCall::AnalyzeSales).map_err(invalid),
            Self::HashFile => serde_json::from_str(raw).map(DebugCall::HashFile).map_err(invalid),
        }
    }
}
