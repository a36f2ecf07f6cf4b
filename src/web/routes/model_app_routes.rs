use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;

use crate::db::AppRecord;
use crate::services::SyncResult;
use crate::services::app_url::{embed_url, themed_embed_url};
use crate::web::models::{AuthenticatedUser, EmbedQuery, EmbedResponse};
use crate::web::{AppError, AppState};

async fn list_apps_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<AppRecord>>, AppError> {
    Ok(Json(app_state.lifecycle.get_all().await?))
}

/// `null` when nothing is attached under this id.
async fn get_app_handler(
    State(app_state): State<Arc<AppState>>,
    Path(app_id): Path<i32>,
) -> Result<Json<Option<AppRecord>>, AppError> {
    Ok(Json(app_state.lifecycle.get_by_id(app_id).await?))
}

async fn embed_handler(
    State(app_state): State<Arc<AppState>>,
    Path(app_id): Path<i32>,
    Query(query): Query<EmbedQuery>,
) -> Result<Json<EmbedResponse>, AppError> {
    let app = app_state
        .lifecycle
        .get_by_id(app_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("app {app_id} does not exist")))?;

    let src = embed_url(&app_state.config.app_url, &app.image_name);
    let src = match query.theme.as_deref() {
        Some(theme) if !src.is_empty() && !theme.is_empty() => {
            themed_embed_url(&src, theme).unwrap_or(src)
        }
        _ => src,
    };
    Ok(Json(EmbedResponse { src }))
}

async fn sync_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(app_id): Path<i32>,
) -> Result<Json<SyncResult>, AppError> {
    app_state
        .lifecycle
        .authorize_sync(app_id, &authenticated_user.caller())
        .await?;
    info!(app_id, user_id = authenticated_user.id, "Sync requested.");
    Ok(Json(app_state.lifecycle.sync(app_id).await?))
}

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_apps_handler))
        .route("/{id}", get(get_app_handler))
        .route("/{id}/embed", get(embed_handler))
}

pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/{id}/sync", post(sync_handler))
}
