pub mod app_events;
pub mod config;
