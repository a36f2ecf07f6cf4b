use crate::db::ModelRecord;

use super::error::LifecycleError;

/// Who is asking for a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i32,
    pub is_moderator: bool,
}

/// Owners and moderators may manage a model's app.
pub fn ensure_can_manage(model: &ModelRecord, caller: &Caller) -> Result<(), LifecycleError> {
    if caller.is_moderator || model.user_id == caller.user_id {
        return Ok(());
    }
    Err(LifecycleError::Forbidden(format!(
        "user {} may not manage the app of model {}",
        caller.user_id, model.id
    )))
}
