use crate::error::AppError;
use crate::present::{QuestionView, QuizSummary, QuizView, ViewMode};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizListResponse {
    pub items: Vec<QuizSummary>,
    pub total: usize,
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<QuizListResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let category = query.category.as_deref().filter(|c| !c.trim().is_empty());
    let items = state
        .list_quizzes(category)
        .await
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok(Json(QuizListResponse { total: items.len(), items }))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<QuizView>), AppError> {
    let req_id = request_id_from_headers(&headers);
    let Json(payload) = payload.map_err(|rej| AppError::from_rejection(rej, req_id.clone()))?;
    let quiz = state
        .create_quiz(&payload)
        .await
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub mode: ViewMode,
}

pub async fn get_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<QuizView>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let quiz = state
        .read_quiz(id, query.mode)
        .await
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok(Json(quiz))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QuizView>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let Json(payload) = payload.map_err(|rej| AppError::from_rejection(rej, req_id.clone()))?;
    let quiz = state
        .update_quiz(id, &payload)
        .await
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let req_id = request_id_from_headers(&headers);
    state
        .delete_quiz(id)
        .await
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QuestionView>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let Json(payload) = payload.map_err(|rej| AppError::from_rejection(rej, req_id.clone()))?;
    let view = state
        .preview_question(&payload)
        .map_err(|err| AppError::from_quiz_error(err, req_id))?;
    Ok(Json(view))
}
