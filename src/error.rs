//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database unreachable: {0}")]
    Connection(String),
    #[error("introspection: {0}")]
    Introspection(String),
    #[error("no semantic mapping for type '{0}'")]
    TypeMapping(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
}

impl Error {
    /// Stable machine-readable kind carried in every error response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Connection(_) => "connection",
            Error::Introspection(_) => "introspection",
            Error::TypeMapping(_) => "type_mapping",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::Conflict(_) => "conflict",
            Error::BadRequest(_) => "bad_request",
            Error::Db(e) => {
                if matches!(e, sqlx::Error::RowNotFound) {
                    "not_found"
                } else {
                    "database"
                }
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Introspection(_) | Error::TypeMapping(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Db(e) => {
                if matches!(e, sqlx::Error::RowNotFound) {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}

/// Constraint-violation SQLSTATE codes surfaced to callers as conflicts.
fn is_conflict_code(code: &str) -> bool {
    // 23505 unique_violation, 23503 foreign_key_violation
    code == "23505" || code == "23503"
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::PoolTimedOut) {
            return Error::Connection("timed out acquiring a connection from the pool".into());
        }
        if let sqlx::Error::Database(db) = &e {
            if db.code().map(|c| is_conflict_code(&c)).unwrap_or(false) {
                return Error::Conflict(db.message().to_string());
            }
        }
        Error::Db(e)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
