use axum::{Router, http::Method, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::services::AppRecordStore;
use crate::hosting::HostingWorker;
use crate::server::app_events::AppEventBroadcaster;
use crate::server::config::ServerConfig;
use crate::services::{AppLifecycleService, ReportService};
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AppRecordStore>,
    pub lifecycle: AppLifecycleService,
    pub reports: ReportService,
    pub app_events: AppEventBroadcaster,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires the services around one store and one event channel.
    pub fn new(
        store: Arc<dyn AppRecordStore>,
        worker: Arc<dyn HostingWorker>,
        config: Arc<ServerConfig>,
    ) -> Self {
        let app_events = AppEventBroadcaster::default();
        Self {
            lifecycle: AppLifecycleService::new(store.clone(), worker, app_events.clone()),
            reports: ReportService::new(store.clone(), app_events.clone()),
            store,
            app_events,
            config,
        }
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(
            "/api/model-apps",
            model_app_routes::public_router().merge(
                model_app_routes::protected_router()
                    .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
            ),
        )
        .nest(
            "/api/models",
            model_routes::public_router().merge(
                model_routes::protected_router()
                    .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
            ),
        )
        .nest("/api/webhooks", webhook_routes::create_router())
        .route(
            "/ws/model-apps/{id}",
            get(websocket_handler::model_app_ws_handler),
        )
        .layer(cors)
        .with_state(app_state)
}
