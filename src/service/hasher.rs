use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::AnalysisError;

/// 计算文件内容的 SHA-256, 返回无分隔符的小写十六进制
pub fn hash_file(path: &Path) -> Result<String, AnalysisError> {
    let mut file = File::open(path).map_err(|e| AnalysisError::not_found(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| AnalysisError::not_found(path, e))?;
    Ok(hex_digest(hasher))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_digest(hasher)
}

fn hex_digest(hasher: Sha256) -> String {
    format!("{:x}", hasher.finalize())
}
