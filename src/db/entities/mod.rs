//! SeaORM entities for the tables the app host owns or reads.

pub mod model;
pub mod model_app;
