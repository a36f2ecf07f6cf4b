use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::services::AppRecordStore;
use crate::db::{AppRecord, ModelAppState};
use crate::hosting::{HostMode, HostRequest, HostingWorker};
use crate::server::app_events::AppEventBroadcaster;

use super::access::{Caller, ensure_can_manage};
use super::error::LifecycleError;

/// What the hosting worker accepted for a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub image_name: String,
    pub port: u16,
}

/// Drives an app through `Building` by submitting it to the hosting worker.
///
/// Overlapping syncs for the same app are not serialized: both mark the record
/// `Building`, both reach the worker, and whichever result is written last wins.
#[derive(Clone)]
pub struct AppLifecycleService {
    store: Arc<dyn AppRecordStore>,
    worker: Arc<dyn HostingWorker>,
    events: AppEventBroadcaster,
}

impl AppLifecycleService {
    pub fn new(
        store: Arc<dyn AppRecordStore>,
        worker: Arc<dyn HostingWorker>,
        events: AppEventBroadcaster,
    ) -> Self {
        Self {
            store,
            worker,
            events,
        }
    }

    /// `None` means no app is attached under this id, which is not an error.
    pub async fn get_by_id(&self, id: i32) -> Result<Option<AppRecord>, LifecycleError> {
        Ok(self.store.find_app(id).await?)
    }

    pub async fn get_all(&self) -> Result<Vec<AppRecord>, LifecycleError> {
        Ok(self.store.find_all_apps().await?)
    }

    /// Owner of the parent model or a moderator.
    pub async fn authorize_sync(&self, id: i32, caller: &Caller) -> Result<(), LifecycleError> {
        let app = self
            .store
            .find_app(id)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(id))?;
        let model = self
            .store
            .find_model(app.model_id)
            .await?
            .ok_or_else(|| LifecycleError::model_not_found(app.model_id))?;
        ensure_can_manage(&model, caller)
    }

    /// Marks the app `Building`, then submits it to the hosting worker.
    ///
    /// The `Building` write is persisted before the worker is called. A worker
    /// failure leaves the app `Building`; only a later report or sync moves it on.
    pub async fn sync(&self, id: i32) -> Result<SyncResult, LifecycleError> {
        let record = self
            .store
            .find_app(id)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(id))?;

        let request = HostRequest::new(record.id, &record.name, &record.url)
            .map_err(|e| LifecycleError::BadRequest(e.to_string()))?;
        let mode = if record.image_name.is_empty() {
            HostMode::Create
        } else {
            HostMode::Update
        };

        let building = self
            .store
            .set_state(id, ModelAppState::Building)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(id))?;
        if building.was_applied() {
            self.events.publish(building.record());
        }
        info!(
            app_id = id,
            previous_state = %record.state,
            %mode,
            "Sync started, app marked Building."
        );

        let hosted = match self.worker.request_build_or_update(&request, mode).await {
            Ok(hosted) => hosted,
            Err(e) => {
                warn!(app_id = id, error = %e, "Hosting worker did not accept the app. It stays Building.");
                return Err(e.into());
            }
        };

        let update = self
            .store
            .set_image_name(id, &hosted.image_name)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(id))?;
        if update.was_applied() {
            self.events.publish(update.record());
        }
        info!(
            app_id = id,
            image_name = %hosted.image_name,
            port = hosted.port,
            image_changed = update.was_applied(),
            "Hosting worker accepted the app."
        );

        Ok(SyncResult {
            image_name: hosted.image_name,
            port: hosted.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::services::InMemoryAppStore;
    use crate::hosting::{HostingWorkerError, UpstreamError};
    use crate::services::report_service::ReportService;
    use crate::services::test_support::{FakeWorker, Reply, app, model};
    use tokio::sync::oneshot;

    fn service(store: Arc<InMemoryAppStore>, worker: Arc<FakeWorker>) -> AppLifecycleService {
        AppLifecycleService::new(store, worker, AppEventBroadcaster::default())
    }

    #[tokio::test]
    async fn test_sync_then_running_report() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::Stopped, ""));
        let worker = Arc::new(FakeWorker::new().reply(Reply::Hosted {
            image_name: "img-42",
            port: 8080,
        }));
        let lifecycle = service(store.clone(), worker.clone());
        let reports = ReportService::new(store.clone(), AppEventBroadcaster::default());

        let result = lifecycle.sync(1).await.unwrap();
        assert_eq!(
            result,
            SyncResult {
                image_name: "img-42".to_string(),
                port: 8080
            }
        );
        // Accepted, not finished.
        let stored = lifecycle.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.state, ModelAppState::Building);
        assert_eq!(stored.image_name, "img-42");

        reports.apply_report(1, "Running", None).await.unwrap();
        let stored = lifecycle.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.state, ModelAppState::Running);
        assert_eq!(stored.image_name, "img-42");
    }

    #[tokio::test]
    async fn test_worker_rejection_leaves_building() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::Stopped, ""));
        let worker = Arc::new(FakeWorker::new().reply(Reply::Reject(UpstreamError {
            status_code: 500,
            error: "build_failed".to_string(),
            message: "oom".to_string(),
        })));
        let lifecycle = service(store.clone(), worker);

        let err = lifecycle.sync(1).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Upstream(HostingWorkerError::Rejected { .. })
        ));
        assert!(err.to_string().contains("oom"));

        let stored = store.find_app(1).await.unwrap().unwrap();
        assert_eq!(stored.state, ModelAppState::Building);
        assert_eq!(stored.image_name, "");
    }

    #[tokio::test]
    async fn test_overlapping_syncs_last_writer_wins() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::Running, "img-0"));
        let (release_first, first_gate) = oneshot::channel();
        let (release_second, second_gate) = oneshot::channel();
        let worker = Arc::new(
            FakeWorker::new()
                .reply_when(first_gate, Reply::Hosted { image_name: "img-A", port: 8080 })
                .reply_when(second_gate, Reply::Hosted { image_name: "img-B", port: 8080 }),
        );
        let lifecycle = service(store.clone(), worker.clone());

        let driver = async {
            while worker.calls().len() < 2 {
                tokio::task::yield_now().await;
            }
            release_second.send(()).unwrap();
            while store.find_app(1).await.unwrap().unwrap().image_name != "img-B" {
                tokio::task::yield_now().await;
            }
            release_first.send(()).unwrap();
        };

        let (first, second, ()) = tokio::join!(lifecycle.sync(1), lifecycle.sync(1), driver);
        assert_eq!(first.unwrap().image_name, "img-A");
        assert_eq!(second.unwrap().image_name, "img-B");

        let stored = store.find_app(1).await.unwrap().unwrap();
        assert_eq!(stored.image_name, "img-A");
        assert_eq!(stored.state, ModelAppState::Building);
        assert!(worker.calls().iter().all(|call| call.mode == HostMode::Update));
    }

    #[tokio::test]
    async fn test_building_is_stored_before_worker_call() {
        for initial in ModelAppState::ALL {
            let store = Arc::new(InMemoryAppStore::new());
            store.insert_app(app(1, 10, initial, "img-1"));
            let worker = Arc::new(
                FakeWorker::observing(store.clone()).reply(Reply::Hosted {
                    image_name: "img-1",
                    port: 8080,
                }),
            );
            let lifecycle = service(store.clone(), worker.clone());

            lifecycle.sync(1).await.unwrap();
            let calls = worker.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].stored_state, Some(ModelAppState::Building));
        }
    }

    #[tokio::test]
    async fn test_first_sync_creates_and_later_ones_update() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::Stopped, ""));
        let worker = Arc::new(
            FakeWorker::new()
                .reply(Reply::Hosted { image_name: "img-1", port: 8080 })
                .reply(Reply::Hosted { image_name: "img-1", port: 8080 }),
        );
        let lifecycle = service(store.clone(), worker.clone());

        lifecycle.sync(1).await.unwrap();
        let after_first = store.find_app(1).await.unwrap().unwrap();
        lifecycle.sync(1).await.unwrap();
        let after_second = store.find_app(1).await.unwrap().unwrap();

        let modes: Vec<HostMode> = worker.calls().iter().map(|call| call.mode).collect();
        assert_eq!(modes, vec![HostMode::Create, HostMode::Update]);
        // Same image and already Building: nothing rewritten.
        assert_eq!(after_second.updated_at, after_first.updated_at);
    }

    #[tokio::test]
    async fn test_unknown_app_is_not_found_and_worker_untouched() {
        let store = Arc::new(InMemoryAppStore::new());
        let worker = Arc::new(FakeWorker::new());
        let lifecycle = service(store, worker.clone());

        assert!(matches!(
            lifecycle.sync(404).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(worker.calls().is_empty());
        assert!(lifecycle.get_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_url_is_rejected_before_mutation() {
        let store = Arc::new(InMemoryAppStore::new());
        let mut record = app(1, 10, ModelAppState::Stopped, "");
        record.url = " ".to_string();
        store.insert_app(record.clone());
        let worker = Arc::new(FakeWorker::new());
        let lifecycle = service(store.clone(), worker.clone());

        assert!(matches!(
            lifecycle.sync(1).await,
            Err(LifecycleError::BadRequest(_))
        ));
        assert_eq!(store.find_app(1).await.unwrap().unwrap(), record);
        assert!(worker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_rejection() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::BuildError, "img-1"));
        let worker = Arc::new(FakeWorker::new().reply(Reply::Timeout));
        let lifecycle = service(store.clone(), worker);

        match lifecycle.sync(1).await {
            Err(LifecycleError::Upstream(e)) => {
                assert!(e.is_timeout());
                assert!(e.upstream().is_none());
            }
            other => panic!("expected upstream timeout, got {other:?}"),
        }
        assert_eq!(
            store.find_app(1).await.unwrap().unwrap().state,
            ModelAppState::Building
        );
    }

    #[tokio::test]
    async fn test_sync_publishes_state_changes() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_app(app(1, 10, ModelAppState::Stopped, ""));
        let worker = Arc::new(FakeWorker::new().reply(Reply::Hosted {
            image_name: "img-42",
            port: 8080,
        }));
        let events = AppEventBroadcaster::default();
        let mut rx = events.subscribe();
        let lifecycle = AppLifecycleService::new(store, worker, events);

        lifecycle.sync(1).await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.state, ModelAppState::Building);
        assert_eq!(first.image_name, "");
        assert_eq!(rx.recv().await.unwrap().image_name, "img-42");
    }

    #[tokio::test]
    async fn test_authorize_sync() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert_model(model(10, 7));
        store.insert_app(app(1, 10, ModelAppState::Stopped, ""));
        let lifecycle = service(store, Arc::new(FakeWorker::new()));

        let owner = Caller { user_id: 7, is_moderator: false };
        let moderator = Caller { user_id: 1, is_moderator: true };
        let stranger = Caller { user_id: 8, is_moderator: false };
        assert!(lifecycle.authorize_sync(1, &owner).await.is_ok());
        assert!(lifecycle.authorize_sync(1, &moderator).await.is_ok());
        assert!(matches!(
            lifecycle.authorize_sync(1, &stranger).await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(matches!(
            lifecycle.authorize_sync(2, &owner).await,
            Err(LifecycleError::NotFound(_))
        ));
    }
}
