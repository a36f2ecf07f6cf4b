//! Level-triggered status polling.
//!
//! A client re-reads the app every [`POLL_INTERVAL`] while the last observed
//! state is `Building` and stops on the first other state, on a missing app,
//! or on a failed query. Each decision is taken from the latest observation
//! alone, so a missed tick is simply caught up on the next one.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::db::{AppRecord, ModelAppState};
use crate::services::{AppLifecycleService, LifecycleError};

pub mod api_client;

pub use api_client::ApiClient;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Status query failed: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Status query returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Anything that answers `getById` for an app.
#[async_trait]
pub trait AppStatusSource: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<AppRecord>, PollError>;
}

#[async_trait]
impl AppStatusSource for AppLifecycleService {
    async fn get_by_id(&self, id: i32) -> Result<Option<AppRecord>, PollError> {
        Ok(AppLifecycleService::get_by_id(self, id).await?)
    }
}

#[async_trait]
impl<T: AppStatusSource + ?Sized> AppStatusSource for Arc<T> {
    async fn get_by_id(&self, id: i32) -> Result<Option<AppRecord>, PollError> {
        (**self).get_by_id(id).await
    }
}

/// Notified after every successful query, so views derived from the app can be refreshed.
pub trait PollObserver: Send {
    fn on_observation(&mut self, app: Option<&AppRecord>);
}

impl<F> PollObserver for F
where
    F: FnMut(Option<&AppRecord>) + Send,
{
    fn on_observation(&mut self, app: Option<&AppRecord>) {
        self(app)
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    /// First non-`Building` state observed.
    Settled(AppRecord),
    /// Nothing is attached under this id.
    NoApp,
    /// The query failed; the last observed record is kept for display.
    QueryFailed {
        last_known: Option<AppRecord>,
        error: PollError,
    },
}

pub fn should_keep_polling(state: ModelAppState) -> bool {
    state.is_building()
}

pub struct StatusPoller<S> {
    source: S,
    interval: Duration,
}

impl<S: AppStatusSource> StatusPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Queries immediately, then once per interval while the app is `Building`.
    pub async fn poll_until_settled<O: PollObserver>(
        &self,
        id: i32,
        observer: &mut O,
    ) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_known = None;

        loop {
            ticker.tick().await;
            match self.source.get_by_id(id).await {
                Ok(Some(app)) => {
                    debug!(app_id = id, state = %app.state, "Polled app status.");
                    observer.on_observation(Some(&app));
                    if !should_keep_polling(app.state) {
                        return PollOutcome::Settled(app);
                    }
                    last_known = Some(app);
                }
                Ok(None) => {
                    debug!(app_id = id, "Polled app status: no app attached.");
                    observer.on_observation(None);
                    return PollOutcome::NoApp;
                }
                Err(error) => {
                    warn!(app_id = id, %error, "Status query failed. Polling stopped.");
                    return PollOutcome::QueryFailed { last_known, error };
                }
            }
        }
    }
}
