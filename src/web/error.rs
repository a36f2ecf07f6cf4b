use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::db::services::StoreError;
use crate::hosting::HostingWorkerError;
use crate::services::LifecycleError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    ValidationFailure(String),
    #[error("Upstream failure: {0}")]
    BadGateway(String),
    #[error("Upstream timeout: {0}")]
    GatewayTimeout(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ValidationFailure(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "Database error while handling request.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {msg}"),
                )
            }
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(msg) => AppError::NotFound(msg),
            LifecycleError::BadRequest(msg) => AppError::InvalidInput(msg),
            LifecycleError::Forbidden(msg) => AppError::Forbidden(msg),
            LifecycleError::ValidationFailure(msg) => AppError::ValidationFailure(msg),
            LifecycleError::Upstream(upstream) => upstream.into(),
            LifecycleError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<HostingWorkerError> for AppError {
    fn from(err: HostingWorkerError) -> Self {
        match err {
            HostingWorkerError::InvalidRequest(msg) => AppError::InvalidInput(msg),
            e if e.is_timeout() => AppError::GatewayTimeout(e.to_string()),
            e => AppError::BadGateway(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::{AppContext, UpstreamError};
    use std::time::Duration;

    fn context() -> AppContext {
        AppContext {
            id: 1,
            name: "demo".to_string(),
            url: "https://github.com/example/demo".to_string(),
        }
    }

    #[test]
    fn test_lifecycle_errors_map_to_statuses() {
        let cases = [
            (LifecycleError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LifecycleError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (LifecycleError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                LifecycleError::ValidationFailure("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LifecycleError::Upstream(HostingWorkerError::Timeout {
                    app: context(),
                    timeout: Duration::from_secs(30),
                }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                LifecycleError::Upstream(HostingWorkerError::Rejected {
                    app: context(),
                    upstream: UpstreamError {
                        status_code: 500,
                        error: "build_failed".to_string(),
                        message: "oom".to_string(),
                    },
                }),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
