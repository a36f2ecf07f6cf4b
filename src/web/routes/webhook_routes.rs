use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

use crate::services::StatusReport;
use crate::web::models::WebhookQuery;
use crate::web::{AppError, AppState};

fn invalid_body(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": format!("Invalid body: {detail}") })),
    )
        .into_response()
}

/// Status reports pushed by the hosting worker. Guarded by the shared webhook token.
async fn hosting_report_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    if query.token.as_deref() != Some(app_state.config.webhook_token.as_str()) {
        warn!("Hosting report rejected: bad or missing webhook token.");
        return Err(AppError::InvalidCredentials);
    }

    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return Ok(invalid_body(&format!("malformed JSON: {e}"))),
    };
    let report = match StatusReport::from_json(&body) {
        Ok(report) => report,
        Err(detail) => {
            warn!(%detail, "Hosting report failed validation.");
            return Ok(invalid_body(&detail));
        }
    };

    let record = app_state.reports.apply(&report).await?;

    let mut response = serde_json::to_value(&record)?;
    if let Value::Object(fields) = &mut response {
        fields.insert("ok".to_string(), Value::Bool(true));
    }
    Ok(Json(response).into_response())
}

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/workers/hosting/report", post(hosting_report_handler))
}
