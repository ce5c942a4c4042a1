use crate::models::{IssueCode, ValidationIssue};
use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// Domain failures raised by the validator, presenter, aggregator and stores.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("unknown question type `{0}`")]
    UnknownType(String),
    #[error("quiz validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("quiz {0} not found")]
    QuizNotFound(i64),
    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl QuizError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptRecord(reason.into())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<String>,
    pub code: IssueCode,
    pub issue: String,
}

impl From<ValidationIssue> for ErrorDetail {
    fn from(issue: ValidationIssue) -> Self {
        Self {
            field: issue.field,
            question_index: issue.question_index,
            code: issue.code,
            issue: issue.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    /// A body axum could not read as JSON still gets the validation envelope.
    pub fn from_rejection(rejection: JsonRejection, request_id: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "request body is not valid JSON",
            request_id,
        )
        .with_details(vec![ErrorDetail {
            field: "body".into(),
            question_index: None,
            code: IssueCode::WrongShape,
            issue: rejection.body_text(),
        }])
    }

    /// Maps a domain error onto the client envelope. Internal failures are
    /// logged here and reach the client only as a generic message.
    pub fn from_quiz_error(err: QuizError, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        match err {
            QuizError::Validation(issues) => Self::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "quiz validation failed",
                request_id,
            )
            .with_details(issues.into_iter().map(ErrorDetail::from).collect()),
            QuizError::UnknownType(tag) => Self::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "quiz validation failed",
                request_id,
            )
            .with_details(vec![ErrorDetail {
                field: "type".into(),
                question_index: None,
                code: IssueCode::UnknownType,
                issue: format!("unknown question type `{tag}`"),
            }]),
            QuizError::QuizNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "quiz not found", request_id)
            }
            err @ (QuizError::CorruptRecord(_) | QuizError::Storage(_)) => {
                tracing::error!(request_id = %request_id, "internal error: {}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error",
                    request_id,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}
