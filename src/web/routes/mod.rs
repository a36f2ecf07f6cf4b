pub mod model_app_routes;
pub mod model_routes;
pub mod webhook_routes;
pub mod websocket_handler;
