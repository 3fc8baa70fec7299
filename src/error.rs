use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// AppError
///
/// The failure taxonomy for request handling. Validation, authorization, and
/// not-found conditions are all recovered locally (flash + redirect) and never reach
/// this type; what remains is infrastructure failure, which must surface as a fatal
/// 500 rather than being silently swallowed.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The request-id span attached by the trace layer correlates this line with
        // the failing request.
        tracing::error!("request failed: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
