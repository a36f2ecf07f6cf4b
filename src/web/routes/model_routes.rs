use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use std::sync::Arc;

use crate::db::AppRecord;
use crate::db::services::AppRecordStore;
use crate::services::{AttachAppRequest, RunTarget, attach_app, dispatch_run};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

async fn attach_app_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(model_id): Path<i32>,
    Json(payload): Json<AttachAppRequest>,
) -> Result<Json<AppRecord>, AppError> {
    let record = attach_app(
        app_state.store.as_ref(),
        model_id,
        &authenticated_user.caller(),
        &payload,
    )
    .await?;
    Ok(Json(record))
}

async fn run_handler(
    State(app_state): State<Arc<AppState>>,
    Path(model_id): Path<i32>,
) -> Result<Json<RunTarget>, AppError> {
    let store = app_state.store.as_ref();
    let model = store
        .find_model(model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("model {model_id} does not exist")))?;
    let app = store.find_app_by_model(model_id).await?;

    Ok(Json(dispatch_run(
        &model,
        app.as_ref(),
        &app_state.config.bot_group_redirect_url,
    )))
}

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new().route("/{id}/run", get(run_handler))
}

pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/{id}/app", put(attach_app_handler))
}
