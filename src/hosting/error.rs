use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::models::UpstreamError;

/// Identifies the app a worker call was made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppContext {
    pub id: i32,
    pub name: String,
    pub url: String,
}

impl fmt::Display for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app {} (name={}, url={})", self.id, self.name, self.url)
    }
}

#[derive(Debug, Error)]
pub enum HostingWorkerError {
    #[error("Invalid hosting request: {0}")]
    InvalidRequest(String),
    #[error("Hosting worker rejected {app}: {upstream}")]
    Rejected {
        app: AppContext,
        upstream: UpstreamError,
    },
    #[error("Hosting worker did not answer within {timeout:?} for {app}")]
    Timeout { app: AppContext, timeout: Duration },
    #[error("Hosting worker request failed for {app}: {message}")]
    Transport {
        app: AppContext,
        status: Option<u16>,
        message: String,
    },
    #[error("Unexpected hosting worker response for {app}: {message}")]
    MalformedResponse { app: AppContext, message: String },
}

impl HostingWorkerError {
    pub fn app(&self) -> Option<&AppContext> {
        match self {
            HostingWorkerError::InvalidRequest(_) => None,
            HostingWorkerError::Rejected { app, .. }
            | HostingWorkerError::Timeout { app, .. }
            | HostingWorkerError::Transport { app, .. }
            | HostingWorkerError::MalformedResponse { app, .. } => Some(app),
        }
    }

    /// The worker's own error body, when it sent a parseable one.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            HostingWorkerError::Rejected { upstream, .. } => Some(upstream),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HostingWorkerError::Timeout { .. })
    }
}
