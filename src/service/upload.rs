use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// 上传文件暂存到临时目录
#[derive(Debug, Clone, Default)]
pub struct UploadStager {
    temp_dir: Option<PathBuf>,
}

/// 已暂存的上传文件, drop 时删除
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    file_name: String,
    size: usize,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// 保留原文件扩展名, 只允许简单的字母数字后缀
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

impl UploadStager {
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self { temp_dir }
    }

    pub fn stage(&self, file_name: &str, bytes: &[u8]) -> io::Result<StagedUpload> {
        let suffix = extension_of(file_name);
        let mut builder = Builder::new();
        builder.prefix("upload-").suffix(&suffix);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(file_name, size = bytes.len(), path = %file.path().display(), "上传文件已暂存");

        Ok(StagedUpload {
            file,
            file_name: file_name.to_string(),
            size: bytes.len(),
        })
    }
}
