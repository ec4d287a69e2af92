//! Maps `AppError` onto HTTP status codes and the JSON error body the
//! dashboard expects: `{ "error": "...", "issues"?: [...] }`.

use crate::domain::error::{AppError, ValidationIssue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const MSG_INVALID_LEAD_ID: &str = "leadId inválido";
pub const MSG_LEAD_NOT_FOUND: &str = "Lead não encontrado";
pub const MSG_INVALID_PAYLOAD: &str = "Dados inválidos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ValidationIssue>>,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                issues: None,
            },
        }
    }

    /// Converts an application error; `fallback` is the only text a client
    /// sees for internal failures.
    pub fn from_app(err: AppError, fallback: &str) -> Self {
        match err {
            AppError::Validation(issues) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorBody {
                    error: MSG_INVALID_PAYLOAD.to_string(),
                    issues: Some(issues),
                },
            },
            AppError::InvalidId(_) => Self::new(StatusCode::BAD_REQUEST, MSG_INVALID_LEAD_ID),
            AppError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, MSG_LEAD_NOT_FOUND),
            AppError::Upstream(code) => {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
                Self::new(status, format!("Erro ao enviar ({code})"))
            }
            other => {
                tracing::error!(error = %other, "{fallback}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
