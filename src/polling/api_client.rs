use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{AppStatusSource, PollError};
use crate::db::AppRecord;

/// Reads app records from a running server's query surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    fn app_url(&self, id: i32) -> String {
        format!("{}/api/model-apps/{id}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AppStatusSource for ApiClient {
    async fn get_by_id(&self, id: i32) -> Result<Option<AppRecord>, PollError> {
        let response = self.client.get(self.app_url(id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Option<AppRecord>>().await?)
    }
}
