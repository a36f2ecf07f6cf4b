use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

use super::error::{AppContext, HostingWorkerError};
use super::models::{HostMode, HostRequest, HostedApp, UpstreamError};
use super::HostingWorker;

/// Reduces a configured worker URL to its origin; the worker's routes hang off the root.
pub fn worker_origin(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid hosting worker url '{raw}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "hosting worker url '{raw}' must use http or https"
        ));
    }
    Ok(url.origin().ascii_serialization())
}

/// Single-shot HTTP adapter for the hosting worker. Never retries.
#[derive(Debug, Clone)]
pub struct HttpHostingWorker {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpHostingWorker {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/model-app", self.base_url.trim_end_matches('/'))
    }

    fn classify_transport(&self, err: reqwest::Error, app: &AppContext) -> HostingWorkerError {
        if err.is_timeout() {
            HostingWorkerError::Timeout {
                app: app.clone(),
                timeout: self.timeout,
            }
        } else {
            HostingWorkerError::Transport {
                app: app.clone(),
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl HostingWorker for HttpHostingWorker {
    async fn request_build_or_update(
        &self,
        request: &HostRequest,
        mode: HostMode,
    ) -> Result<HostedApp, HostingWorkerError> {
        let app = request.context();
        let endpoint = self.endpoint();
        debug!(app_id = request.id, %mode, %endpoint, "Submitting app to hosting worker.");

        let response = self
            .client
            .request(mode.method(), &endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_transport(e, &app))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify_transport(e, &app))?;

        decode_response(status, &body, request)
    }
}

fn decode_response(
    status: StatusCode,
    body: &[u8],
    request: &HostRequest,
) -> Result<HostedApp, HostingWorkerError> {
    if status.is_success() {
        let hosted: HostedApp =
            serde_json::from_slice(body).map_err(|e| HostingWorkerError::MalformedResponse {
                app: request.context(),
                message: format!("invalid success body ({status}): {e}"),
            })?;
        if hosted.id != request.id {
            return Err(HostingWorkerError::MalformedResponse {
                app: request.context(),
                message: format!("response is for app {} instead of {}", hosted.id, request.id),
            });
        }
        return Ok(hosted);
    }

    match serde_json::from_slice::<UpstreamError>(body) {
        Ok(upstream) => Err(HostingWorkerError::Rejected {
            app: request.context(),
            upstream,
        }),
        Err(_) => Err(HostingWorkerError::Transport {
            app: request.context(),
            status: Some(status.as_u16()),
            message: format!("hosting worker responded with {status}"),
        }),
    }
}
