use thiserror::Error;

use crate::db::services::StoreError;
use crate::hosting::HostingWorkerError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation failed: {0}")]
    ValidationFailure(String),
    #[error(transparent)]
    Upstream(#[from] HostingWorkerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn app_not_found(id: i32) -> Self {
        LifecycleError::NotFound(format!("app {id} does not exist"))
    }

    pub fn model_not_found(model_id: i32) -> Self {
        LifecycleError::NotFound(format!("model {model_id} does not exist"))
    }
}
