#![allow(dead_code)]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn error(code: &str, message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Application error type. Each constructor corresponds to one of the
/// engine's error kinds and carries the HTTP status that kind maps to.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn insufficient_funds(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS", message)
    }

    pub fn unfillable_market(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "UNFILLABLE_MARKET", message)
    }

    pub fn terminal_state(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "TERMINAL_STATE", message)
    }

    pub fn contention(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "CONTENTION", message)
    }

    pub fn consistency(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CONSISTENCY", message)
    }

    pub fn internal(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(&self.code, &self.message);
        (self.status, Json(body)).into_response()
    }
}

impl From<crate::engine::EngineError> for AppError {
    fn from(err: crate::engine::EngineError) -> Self {
        use crate::engine::EngineError::*;
        match err {
            Validation(msg) => AppError::validation(&msg),
            NotFound(msg) => AppError::not_found(&msg),
            Forbidden(msg) => AppError::forbidden(&msg),
            InsufficientFunds(msg) => AppError::insufficient_funds(&msg),
            UnfillableMarket(msg) => AppError::unfillable_market(&msg),
            TerminalState(msg) => AppError::terminal_state(&msg),
            Contention => AppError::contention("lock could not be acquired, retries exhausted"),
            Consistency(msg) => {
                tracing::error!(error = %msg, "consistency violation during settlement");
                AppError::consistency(&msg)
            }
            Database(e) => {
                tracing::error!(error = %e, "database error");
                AppError::internal("internal database error")
            }
        }
    }
}
