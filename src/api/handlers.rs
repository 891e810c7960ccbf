use crate::api::form::read_form;
use crate::api::AppState;
use crate::service::StagedUpload;
use axum::{
    extract::{Json, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 根路径响应
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// 问答响应
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// 问答接口的错误响应
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorDetail { detail: message.into() })).into_response()
}

pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Answer API!".to_string(),
    })
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 问答接口: question + 可选文件, 转发给大模型
pub async fn ask(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return detail(e.status(), e.body_text()),
    };

    let Some(question) = form.field("question").map(str::trim).filter(|q| !q.is_empty()) else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "field required: question");
    };

    let staged: Option<StagedUpload> = match &form.file {
        Some(file) => match state.uploads.stage(&file.file_name, &file.bytes) {
            Ok(staged) => Some(staged),
            Err(e) => {
                tracing::error!("保存上传文件失败: {}", e);
                return detail(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to store upload: {e}"));
            }
        },
        None => None,
    };

    tracing::info!(
        question_len = question.len(),
        file = staged.as_ref().map(|s| s.file_name()),
        file_size = staged.as_ref().map(|s| s.size()),
        "收到问答请求"
    );

    match state.llm.answer(question, staged.as_ref()).await {
        Ok(answer) => (StatusCode::OK, Json(AnswerResponse { answer })).into_response(),
        Err(e) => {
            tracing::error!("问答失败: {}", e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
