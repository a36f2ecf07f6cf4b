pub mod entities;
pub mod services;

pub use entities::model::Model as ModelRecord;
pub use entities::model_app::{Model as AppRecord, ModelAppState};
