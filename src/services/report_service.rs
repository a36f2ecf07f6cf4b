use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::entities::model_app::Transition;
use crate::db::services::AppRecordStore;
use crate::db::{AppRecord, ModelAppState};
use crate::server::app_events::AppEventBroadcaster;

use super::error::LifecycleError;

/// A lifecycle notification sent by the hosting worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub id: i32,
    pub state: ModelAppState,
    pub image_name: Option<String>,
}

impl StatusReport {
    /// Validates a webhook body. The error lists every offending field.
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let mut errors = Vec::new();

        let id = match body.get("id") {
            Some(value) => match value.as_i64().and_then(|id| i32::try_from(id).ok()) {
                Some(id) => Some(id),
                None => {
                    errors.push("id: expected an integer".to_string());
                    None
                }
            },
            None => {
                errors.push("id: required".to_string());
                None
            }
        };

        let state = match body.get("state") {
            Some(Value::String(raw)) => match raw.parse::<ModelAppState>() {
                Ok(state) => Some(state),
                Err(_) => {
                    errors.push(format!("state: expected one of {}", state_names()));
                    None
                }
            },
            Some(_) => {
                errors.push(format!("state: expected one of {}", state_names()));
                None
            }
            None => {
                errors.push("state: required".to_string());
                None
            }
        };

        let image_name = match body.get("imageName") {
            None | Some(Value::Null) => None,
            Some(Value::String(image_name)) => Some(image_name.clone()),
            Some(_) => {
                errors.push("imageName: expected a string".to_string());
                None
            }
        };

        match (id, state) {
            (Some(id), Some(state)) if errors.is_empty() => Ok(StatusReport {
                id,
                state,
                image_name,
            }),
            _ => Err(errors.join("; ")),
        }
    }
}

fn state_names() -> String {
    ModelAppState::ALL
        .iter()
        .map(ModelAppState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Applies status reports. The only writer of `Running`, `RuntimeError` and `BuildError`.
///
/// Reports are not compared against the previous state: the latest one wins and
/// replaying a report changes nothing.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn AppRecordStore>,
    events: AppEventBroadcaster,
}

impl ReportService {
    pub fn new(store: Arc<dyn AppRecordStore>, events: AppEventBroadcaster) -> Self {
        Self { store, events }
    }

    /// Rejects an unknown `reported_state` before storage is touched.
    pub async fn apply_report(
        &self,
        id: i32,
        reported_state: &str,
        image_name: Option<&str>,
    ) -> Result<AppRecord, LifecycleError> {
        let state = reported_state
            .parse::<ModelAppState>()
            .map_err(|e| LifecycleError::BadRequest(e.to_string()))?;
        self.apply(&StatusReport {
            id,
            state,
            image_name: image_name.map(str::to_string),
        })
        .await
    }

    pub async fn apply(&self, report: &StatusReport) -> Result<AppRecord, LifecycleError> {
        let current = self
            .store
            .find_app(report.id)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(report.id))?;

        match current.state.transition_to(report.state) {
            Transition::Unchanged => {
                debug!(app_id = report.id, state = %report.state, "Duplicate status report.")
            }
            Transition::Expected => {}
            Transition::OutOfBand => warn!(
                app_id = report.id,
                from = %current.state,
                to = %report.state,
                "Status report outside the usual transitions. Applying it anyway."
            ),
        }

        let mut changed = false;
        // An empty image name would erase the built image; only real names are applied.
        if let Some(image_name) = report.image_name.as_deref().filter(|name| !name.is_empty()) {
            let update = self
                .store
                .set_image_name(report.id, image_name)
                .await?
                .ok_or_else(|| LifecycleError::app_not_found(report.id))?;
            changed |= update.was_applied();
        }

        let update = self
            .store
            .set_state(report.id, report.state)
            .await?
            .ok_or_else(|| LifecycleError::app_not_found(report.id))?;
        changed |= update.was_applied();
        let record = update.into_record();

        if changed {
            self.events.publish(&record);
        }
        info!(
            app_id = report.id,
            from = %current.state,
            to = %record.state,
            image_name = %record.image_name,
            changed,
            "Applied status report."
        );
        Ok(record)
    }
}
