use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, Ordering};

use super::{AppRecordStore, FieldUpdate, StoreError};
use crate::db::{AppRecord, ModelAppState, ModelRecord};

/// Process-local record store. Each field update holds the record's shard lock,
/// which gives the same per-field atomicity the database store relies on.
#[derive(Debug)]
pub struct InMemoryAppStore {
    apps: DashMap<i32, AppRecord>,
    models: DashMap<i32, ModelRecord>,
    next_app_id: AtomicI32,
}

impl Default for InMemoryAppStore {
    fn default() -> Self {
        Self {
            apps: DashMap::new(),
            models: DashMap::new(),
            next_app_id: AtomicI32::new(1),
        }
    }
}

impl InMemoryAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_model(&self, model: ModelRecord) {
        self.models.insert(model.id, model);
    }

    /// Seeds an app record as-is, keeping the id counter ahead of it.
    pub fn insert_app(&self, app: AppRecord) {
        self.next_app_id.fetch_max(app.id + 1, Ordering::SeqCst);
        self.apps.insert(app.id, app);
    }

    fn update_field<F>(&self, id: i32, apply: F) -> Option<FieldUpdate>
    where
        F: FnOnce(&mut AppRecord) -> bool,
    {
        let mut entry = self.apps.get_mut(&id)?;
        let record = entry.value_mut();
        if apply(record) {
            record.updated_at = Utc::now();
            Some(FieldUpdate::Applied(record.clone()))
        } else {
            Some(FieldUpdate::Unchanged(record.clone()))
        }
    }
}

#[async_trait]
impl AppRecordStore for InMemoryAppStore {
    async fn find_app(&self, id: i32) -> Result<Option<AppRecord>, StoreError> {
        Ok(self.apps.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_all_apps(&self) -> Result<Vec<AppRecord>, StoreError> {
        let mut apps: Vec<AppRecord> = self.apps.iter().map(|entry| entry.value().clone()).collect();
        apps.sort_by_key(|app| app.id);
        Ok(apps)
    }

    async fn find_app_by_model(&self, model_id: i32) -> Result<Option<AppRecord>, StoreError> {
        Ok(self
            .apps
            .iter()
            .find(|entry| entry.value().model_id == model_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_model(&self, model_id: i32) -> Result<Option<ModelRecord>, StoreError> {
        Ok(self.models.get(&model_id).map(|entry| entry.value().clone()))
    }

    async fn set_state(
        &self,
        id: i32,
        state: ModelAppState,
    ) -> Result<Option<FieldUpdate>, StoreError> {
        Ok(self.update_field(id, |record| {
            if record.state == state {
                return false;
            }
            record.state = state;
            true
        }))
    }

    async fn set_image_name(
        &self,
        id: i32,
        image_name: &str,
    ) -> Result<Option<FieldUpdate>, StoreError> {
        Ok(self.update_field(id, |record| {
            if record.image_name == image_name {
                return false;
            }
            record.image_name = image_name.to_string();
            true
        }))
    }

    async fn upsert_app_for_model(
        &self,
        model_id: i32,
        name: &str,
        url: &str,
    ) -> Result<AppRecord, StoreError> {
        let existing_id = self
            .apps
            .iter()
            .find(|entry| entry.value().model_id == model_id)
            .map(|entry| *entry.key());

        if let Some(id) = existing_id {
            if let Some(update) = self.update_field(id, |record| {
                if record.name == name && record.url == url {
                    return false;
                }
                record.name = name.to_string();
                record.url = url.to_string();
                true
            }) {
                return Ok(update.into_record());
            }
        }

        let now = Utc::now();
        let record = AppRecord {
            id: self.next_app_id.fetch_add(1, Ordering::SeqCst),
            model_id,
            name: name.to_string(),
            url: url.to_string(),
            image_name: String::new(),
            state: ModelAppState::Stopped,
            created_at: now,
            updated_at: now,
        };
        self.apps.insert(record.id, record.clone());
        Ok(record)
    }
}
