use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::session::clear_session_cookie;

/// Where unauthenticated callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// AppError
///
/// The single failure taxonomy shared by the credential service, the access guard
/// and the content integrity manager. Authentication failures (`InvalidSession`,
/// `Unauthenticated`) and authorization failures (`Forbidden`) map to different
/// responses: a redirect to the login entry point versus an explicit denial.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Weak credential input: {0}")]
    WeakInput(String),

    #[error("Stored credential is corrupt")]
    CorruptCredential,

    #[error("Invalid session")]
    InvalidSession,

    /// Wrong email or password at the login entry point.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already in use")]
    Conflict(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidSession | AppError::Unauthenticated => {
                tracing::debug!("Rejecting unauthenticated request: {}", self);
                (
                    [(header::SET_COOKIE, clear_session_cookie())],
                    Redirect::to(LOGIN_PATH),
                )
                    .into_response()
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid email or password" })),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "forbidden" })),
            )
                .into_response(),
            AppError::WeakInput(msg) | AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            AppError::Conflict(field) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": format!("{field} already in use") })),
            )
                .into_response(),
            AppError::CorruptCredential => {
                tracing::error!("Stored password hash could not be parsed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "stored credential is unusable; reset your password"
                    })),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

pub type AppResult<T> = Result<T, AppError>;
