use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use std::collections::HashMap;

/// 上传的文件字段
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// 解析后的 multipart 表单: 文本字段 + 可选的 `file` 字段
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

pub async fn read_form(mut multipart: Multipart) -> Result<FormData, MultipartError> {
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await?;
            // 浏览器在未选择文件时也会提交一个空的 file 字段
            if file_name.as_deref().map_or(true, str::is_empty) && bytes.is_empty() {
                continue;
            }
            form.file = Some(UploadedFile {
                file_name: file_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "upload".to_string()),
                bytes,
            });
        } else {
            let text = field.text().await?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}
