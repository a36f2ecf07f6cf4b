//! Record store for app records and the models they belong to.
//!
//! Every write is a single-field (or name/url pair) update applied directly at the
//! storage layer. Writes whose value equals the stored one are skipped, so
//! `updated_at` only moves when something actually changed.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::db::{AppRecord, ModelAppState, ModelRecord};

pub mod memory_store;
pub mod model_app_service;

pub use memory_store::InMemoryAppStore;
pub use model_app_service::DbAppStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
}

/// Result of a field update against an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Applied(AppRecord),
    /// Stored value already matched; nothing was written.
    Unchanged(AppRecord),
}

impl FieldUpdate {
    pub fn record(&self) -> &AppRecord {
        match self {
            FieldUpdate::Applied(record) | FieldUpdate::Unchanged(record) => record,
        }
    }

    pub fn into_record(self) -> AppRecord {
        match self {
            FieldUpdate::Applied(record) | FieldUpdate::Unchanged(record) => record,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, FieldUpdate::Applied(_))
    }
}

#[async_trait]
pub trait AppRecordStore: Send + Sync {
    async fn find_app(&self, id: i32) -> Result<Option<AppRecord>, StoreError>;

    async fn find_all_apps(&self) -> Result<Vec<AppRecord>, StoreError>;

    async fn find_app_by_model(&self, model_id: i32) -> Result<Option<AppRecord>, StoreError>;

    async fn find_model(&self, model_id: i32) -> Result<Option<ModelRecord>, StoreError>;

    /// Returns `None` when no record has this id.
    async fn set_state(
        &self,
        id: i32,
        state: ModelAppState,
    ) -> Result<Option<FieldUpdate>, StoreError>;

    /// Returns `None` when no record has this id.
    async fn set_image_name(
        &self,
        id: i32,
        image_name: &str,
    ) -> Result<Option<FieldUpdate>, StoreError>;

    /// Creates the model's app on first attach (state `Stopped`, no image),
    /// otherwise re-points `name`/`url` on the existing record without touching its id.
    async fn upsert_app_for_model(
        &self,
        model_id: i32,
        name: &str,
        url: &str,
    ) -> Result<AppRecord, StoreError>;
}
