use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{ledger::LedgerError, oracle::OracleError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

/// Request-level failures that aren't ledger or oracle errors.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("connect a wallet first")]
    NotConnected,
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        if let Some(err) = self.0.downcast_ref::<LedgerError>() {
            use LedgerError::*;
            let status = match err {
                DuplicateIdentity(_) | UsernameTaken(_) => StatusCode::CONFLICT,
                UsernameInvalid | ContentInvalid | SelfMessage => StatusCode::UNPROCESSABLE_ENTITY,
                NotRegistered(_) => StatusCode::FORBIDDEN,
                UnknownCounterpart(_) => StatusCode::NOT_FOUND,
                UnexpectedEvent | Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (status, err.kind());
        }
        if self.0.downcast_ref::<OracleError>().is_some() {
            return (StatusCode::BAD_GATEWAY, "oracle");
        }
        match self.0.downcast_ref::<Rejection>() {
            Some(Rejection::NotConnected) => (StatusCode::UNAUTHORIZED, "not_connected"),
            Some(Rejection::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(error = %self.0, "request failed\n{}", self.0.backtrace());
        }

        (
            status,
            Json(json!({ "error": kind, "message": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
