use serde::{Deserialize, Serialize};

use crate::services::Caller;

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i32,
    pub exp: usize,
    #[serde(default)]
    pub is_moderator: bool,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub is_moderator: bool,
}

impl AuthenticatedUser {
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            is_moderator: self.is_moderator,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbedQuery {
    pub theme: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub src: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
}
