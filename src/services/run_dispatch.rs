use serde::Serialize;

use crate::db::{AppRecord, ModelRecord};

/// Where a "run" action on a model should take the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunTarget {
    HostedApp { path: String },
    BotGroup { url: String },
    RunStrategy { model_version_id: Option<i32> },
}

/// Hosted app first, then the bot group redirect, then the model's run strategy.
pub fn dispatch_run(
    model: &ModelRecord,
    app: Option<&AppRecord>,
    bot_group_redirect_url: &str,
) -> RunTarget {
    if let Some(app) = app.filter(|app| app.id > 0) {
        return RunTarget::HostedApp {
            path: format!("/app/{}", app.id),
        };
    }
    if model
        .bot_group_url
        .as_deref()
        .is_some_and(|url| !url.is_empty())
    {
        return RunTarget::BotGroup {
            url: bot_group_redirect_url.to_string(),
        };
    }
    RunTarget::RunStrategy {
        model_version_id: model.model_version_id,
    }
}
