//! App hosting services: sync orchestration, status report ingestion,
//! app attachment and the pure routing helpers built on top of app records.

pub mod access;
pub mod app_lifecycle_service;
pub mod app_url;
pub mod attach_service;
pub mod error;
pub mod report_service;
pub mod run_dispatch;

pub use access::{Caller, ensure_can_manage};
pub use app_lifecycle_service::{AppLifecycleService, SyncResult};
pub use attach_service::{AppSource, AttachAppRequest, attach_app};
pub use error::LifecycleError;
pub use report_service::{ReportService, StatusReport};
pub use run_dispatch::{RunTarget, dispatch_run};

#[cfg(test)]
pub(crate) mod test_support;
