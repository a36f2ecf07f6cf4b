use serde::Deserialize;
use tracing::info;

use crate::db::AppRecord;
use crate::db::services::AppRecordStore;

use super::access::{Caller, ensure_can_manage};
use super::error::LifecycleError;

/// Body of an attach request: either an existing app to copy, or a repository to import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachAppRequest {
    pub existing_app_id: Option<i32>,
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSource {
    SelectExisting { app_id: i32 },
    Import { name: String, url: String },
}

impl AttachAppRequest {
    pub fn source(&self) -> Result<AppSource, LifecycleError> {
        let importing = self.name.is_some() || self.url.is_some();
        match (self.existing_app_id, importing) {
            (Some(_), true) => Err(LifecycleError::ValidationFailure(
                "choose either an existing app or a repository to import, not both".to_string(),
            )),
            (None, false) => Err(LifecycleError::ValidationFailure(
                "an existing app or a repository to import is required".to_string(),
            )),
            (Some(app_id), false) => Ok(AppSource::SelectExisting { app_id }),
            (None, true) => {
                let name = self.name.as_deref().unwrap_or_default().trim();
                let url = self.url.as_deref().unwrap_or_default().trim();
                if name.is_empty() {
                    return Err(LifecycleError::BadRequest("name must not be empty".to_string()));
                }
                if url.is_empty() {
                    return Err(LifecycleError::BadRequest("url must not be empty".to_string()));
                }
                Ok(AppSource::Import {
                    name: name.to_string(),
                    url: url.to_string(),
                })
            }
        }
    }
}

/// Attaches an app to a model, creating the record on first attach and
/// re-pointing `name`/`url` on later ones. Does not trigger a sync.
pub async fn attach_app(
    store: &dyn AppRecordStore,
    model_id: i32,
    caller: &Caller,
    request: &AttachAppRequest,
) -> Result<AppRecord, LifecycleError> {
    let source = request.source()?;

    let model = store
        .find_model(model_id)
        .await?
        .ok_or_else(|| LifecycleError::model_not_found(model_id))?;
    ensure_can_manage(&model, caller)?;

    let (name, url) = match source {
        AppSource::SelectExisting { app_id } => {
            let existing = store
                .find_app(app_id)
                .await?
                .ok_or_else(|| LifecycleError::app_not_found(app_id))?;
            (existing.name, existing.url)
        }
        AppSource::Import { name, url } => (name, url),
    };

    let record = store.upsert_app_for_model(model_id, &name, &url).await?;
    info!(
        model_id,
        app_id = record.id,
        name = %record.name,
        url = %record.url,
        "Attached app to model."
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ModelAppState;
    use crate::db::services::InMemoryAppStore;
    use crate::services::test_support::{app, model};

    const OWNER: Caller = Caller {
        user_id: 7,
        is_moderator: false,
    };

    fn import(name: &str, url: &str) -> AttachAppRequest {
        AttachAppRequest {
            existing_app_id: None,
            name: Some(name.to_string()),
            url: Some(url.to_string()),
        }
    }

    #[test]
    fn test_source_requires_exactly_one_mode() {
        let both = AttachAppRequest {
            existing_app_id: Some(1),
            ..import("demo", "https://github.com/a/demo")
        };
        assert!(matches!(both.source(), Err(LifecycleError::ValidationFailure(_))));
        assert!(matches!(
            AttachAppRequest::default().source(),
            Err(LifecycleError::ValidationFailure(_))
        ));
        assert!(matches!(
            import(" ", "https://github.com/a/demo").source(),
            Err(LifecycleError::BadRequest(_))
        ));
        let url_only = AttachAppRequest {
            url: Some("https://github.com/a/demo".to_string()),
            ..Default::default()
        };
        assert!(matches!(url_only.source(), Err(LifecycleError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_import_creates_then_repoints() {
        let store = InMemoryAppStore::new();
        store.insert_model(model(10, 7));

        let created = attach_app(&store, 10, &OWNER, &import("demo", "https://github.com/a/demo"))
            .await
            .unwrap();
        assert_eq!(created.state, ModelAppState::Stopped);
        assert_eq!(created.model_id, 10);

        let repointed = attach_app(&store, 10, &OWNER, &import("demo2", "https://github.com/a/demo2"))
            .await
            .unwrap();
        assert_eq!(repointed.id, created.id);
        assert_eq!(repointed.url, "https://github.com/a/demo2");
    }

    #[tokio::test]
    async fn test_select_existing_copies_name_and_url() {
        let store = InMemoryAppStore::new();
        store.insert_model(model(10, 7));
        store.insert_model(model(20, 7));
        let source = app(1, 20, ModelAppState::Running, "img-1");
        store.insert_app(source.clone());

        let request = AttachAppRequest {
            existing_app_id: Some(1),
            ..Default::default()
        };
        let attached = attach_app(&store, 10, &OWNER, &request).await.unwrap();
        assert_ne!(attached.id, source.id);
        assert_eq!(attached.name, source.name);
        assert_eq!(attached.url, source.url);
        assert_eq!(attached.image_name, "");

        let missing = AttachAppRequest {
            existing_app_id: Some(99),
            ..Default::default()
        };
        assert!(matches!(
            attach_app(&store, 10, &OWNER, &missing).await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stranger_cannot_attach() {
        let store = InMemoryAppStore::new();
        store.insert_model(model(10, 7));
        let stranger = Caller {
            user_id: 8,
            is_moderator: false,
        };

        assert!(matches!(
            attach_app(&store, 10, &stranger, &import("demo", "https://github.com/a/demo")).await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(store.find_all_apps().await.unwrap().is_empty());
        assert!(matches!(
            attach_app(&store, 11, &OWNER, &import("demo", "https://github.com/a/demo")).await,
            Err(LifecycleError::NotFound(_))
        ));
    }
}
