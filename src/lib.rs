pub mod db;
pub mod hosting;
pub mod polling;
pub mod server;
pub mod services;
pub mod version;
pub mod web;
