use crate::api::form::read_form;
use crate::api::AppState;
use crate::error::AnalysisError;
use crate::models::{DebugCall, DebugOperation, SalesQuery};
use crate::service::{aggregate, hash_file, StagedUpload};
use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use serde_json::Value;

/// 调试接口成功响应
#[derive(Debug, Serialize)]
pub struct DebugResult {
    pub result: Value,
}

/// 调试接口错误响应
#[derive(Debug, Serialize)]
pub struct DebugError {
    pub error: String,
}

enum DebugFailure {
    MissingFile(DebugOperation),
    Analysis(AnalysisError),
}

impl From<AnalysisError> for DebugFailure {
    fn from(e: AnalysisError) -> Self {
        Self::Analysis(e)
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(DebugError { error: message.into() })).into_response()
}

pub fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
        AnalysisError::NotFound { .. } => StatusCode::NOT_FOUND,
        AnalysisError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Compute(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 金额转 JSON 数字: 整数保持整数, 否则转浮点
pub fn decimal_to_json(value: &BigDecimal) -> Value {
    if value.with_scale(0) == *value {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

async fn run_blocking<T, F>(task: F) -> Result<T, AnalysisError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AnalysisError::Compute(format!("worker task failed: {e}")))?
}

async fn execute(call: DebugCall, staged: Option<&StagedUpload>) -> Result<Value, DebugFailure> {
    match call {
        DebugCall::AnalyzeSales(mut params) => {
            if let Some(upload) = staged {
                params.file_path = Some(upload.path().to_path_buf());
            }
            let query = SalesQuery::try_from(params)?;
            let total = run_blocking(move || aggregate(&query)).await?;
            Ok(decimal_to_json(&total))
        }
        DebugCall::HashFile(_) => {
            let upload = staged.ok_or(DebugFailure::MissingFile(DebugOperation::HashFile))?;
            let path = upload.path().to_path_buf();
            let digest = run_blocking(move || hash_file(&path)).await?;
            Ok(Value::String(digest))
        }
    }
}

/// 调试接口: 按函数名查表调用辅助函数
pub async fn debug_function(
    State(state): State<AppState>,
    Path(function_name): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(operation) = DebugOperation::lookup(&function_name) else {
        tracing::warn!(
            function_name = %function_name,
            supported = ?DebugOperation::names().collect::<Vec<_>>(),
            "调试接口: 未登记的函数"
        );
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Function {function_name} not supported for direct testing"),
        );
    };

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e.status(), e.body_text()),
    };

    let call = match operation.parse_params(form.field("params").unwrap_or("{}")) {
        Ok(call) => call,
        Err(e) => return error_response(status_for(&e), e.to_string()),
    };

    let staged = match &form.file {
        Some(file) => match state.uploads.stage(&file.file_name, &file.bytes) {
            Ok(staged) => Some(staged),
            Err(e) => {
                tracing::error!("保存上传文件失败: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to store upload: {e}"));
            }
        },
        None => None,
    };

    match execute(call, staged.as_ref()).await {
        Ok(result) => {
            tracing::info!(function = operation.name(), "调试调用成功");
            (StatusCode::OK, Json(DebugResult { result })).into_response()
        }
        Err(DebugFailure::MissingFile(op)) => {
            error_response(StatusCode::BAD_REQUEST, format!("No file provided for {}", op.name()))
        }
        Err(DebugFailure::Analysis(e)) => {
            tracing::warn!(function = operation.name(), "调试调用失败: {}", e);
            error_response(status_for(&e), e.to_string())
        }
    }
}
