use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::db::services::{AppRecordStore, InMemoryAppStore};
use crate::db::{AppRecord, ModelAppState, ModelRecord};
use crate::hosting::{HostMode, HostRequest, HostedApp, HostingWorker, HostingWorkerError, UpstreamError};

pub enum Reply {
    Hosted { image_name: &'static str, port: u16 },
    Reject(UpstreamError),
    Timeout,
}

struct Scripted {
    gate: Option<oneshot::Receiver<()>>,
    reply: Reply,
}

#[derive(Debug, Clone)]
pub struct ObservedCall {
    pub request: HostRequest,
    pub mode: HostMode,
    /// Stored state of the app at the moment the worker saw the call.
    pub stored_state: Option<ModelAppState>,
}

/// Scripted hosting worker. Replies are consumed in call order.
pub struct FakeWorker {
    script: Mutex<VecDeque<Scripted>>,
    store: Option<Arc<InMemoryAppStore>>,
    calls: Mutex<Vec<ObservedCall>>,
}

impl FakeWorker {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            store: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn observing(store: Arc<InMemoryAppStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.script.lock().unwrap().push_back(Scripted { gate: None, reply });
        self
    }

    /// Holds the reply until `gate` fires.
    pub fn reply_when(self, gate: oneshot::Receiver<()>, reply: Reply) -> Self {
        self.script.lock().unwrap().push_back(Scripted {
            gate: Some(gate),
            reply,
        });
        self
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostingWorker for FakeWorker {
    async fn request_build_or_update(
        &self,
        request: &HostRequest,
        mode: HostMode,
    ) -> Result<HostedApp, HostingWorkerError> {
        let stored_state = match &self.store {
            Some(store) => store.find_app(request.id).await.unwrap().map(|app| app.state),
            None => None,
        };
        self.calls.lock().unwrap().push(ObservedCall {
            request: request.clone(),
            mode,
            stored_state,
        });

        let scripted = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected hosting worker call");
        if let Some(gate) = scripted.gate {
            gate.await.unwrap();
        }
        match scripted.reply {
            Reply::Hosted { image_name, port } => Ok(HostedApp {
                id: request.id,
                port,
                image_name: image_name.to_string(),
            }),
            Reply::Reject(upstream) => Err(HostingWorkerError::Rejected {
                app: request.context(),
                upstream,
            }),
            Reply::Timeout => Err(HostingWorkerError::Timeout {
                app: request.context(),
                timeout: Duration::from_secs(30),
            }),
        }
    }
}

pub fn app(id: i32, model_id: i32, state: ModelAppState, image_name: &str) -> AppRecord {
    let now = Utc::now();
    AppRecord {
        id,
        model_id,
        name: format!("app-{id}"),
        url: format!("https://github.com/example/app-{id}"),
        image_name: image_name.to_string(),
        state,
        created_at: now,
        updated_at: now,
    }
}

pub fn model(id: i32, owner: i32) -> ModelRecord {
    ModelRecord {
        id,
        user_id: owner,
        name: format!("model-{id}"),
        model_version_id: Some(id * 100),
        bot_group_url: None,
        created_at: Utc::now(),
    }
}
