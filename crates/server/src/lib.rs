use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod budgets;
mod categories;
mod extract;
mod households;
mod invitations;
mod members;
mod receipts;
mod reports;
mod rpc;
mod server;
mod transactions;
mod users;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
    Unauthorized,
}

#[derive(Serialize)]
struct Error {
    error: String,
}

pub(crate) fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::Expired(_) => StatusCode::GONE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidDate(_)
        | EngineError::InvalidCursor(_)
        | EngineError::InvalidSettings(_)
        | EngineError::InvalidCurrency(_) => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl ServerError {
    /// Status and client-facing message. Database details are logged, never
    /// returned.
    pub(crate) fn into_parts(self) -> (StatusCode, String) {
        match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = self.into_parts();
        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
