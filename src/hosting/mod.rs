//! Client for the external hosting worker that builds and runs app containers.
//!
//! The client only talks to the worker; persisting what it returns is the
//! lifecycle service's job.

use async_trait::async_trait;

pub mod client;
pub mod error;
pub mod models;

pub use client::{HttpHostingWorker, worker_origin};
pub use error::{AppContext, HostingWorkerError};
pub use models::{HostMode, HostRequest, HostedApp, UpstreamError};

#[async_trait]
pub trait HostingWorker: Send + Sync {
    /// Submits the app for build (`Create`) or redeploy (`Update`).
    ///
    /// A success only means the worker accepted the build; completion arrives
    /// later as a status report.
    async fn request_build_or_update(
        &self,
        request: &HostRequest,
        mode: HostMode,
    ) -> Result<HostedApp, HostingWorkerError>;
}
