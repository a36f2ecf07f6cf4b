use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{AppContext, HostingWorkerError};

/// Body of `POST|PUT {base}/model-app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRequest {
    pub id: i32,
    pub name: String,
    pub url: String,
}

impl HostRequest {
    pub fn new(id: i32, name: &str, url: &str) -> Result<Self, HostingWorkerError> {
        if name.trim().is_empty() {
            return Err(HostingWorkerError::InvalidRequest(format!(
                "app {id} has an empty name"
            )));
        }
        if url.trim().is_empty() {
            return Err(HostingWorkerError::InvalidRequest(format!(
                "app {id} has an empty repository url"
            )));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    pub fn context(&self) -> AppContext {
        AppContext {
            id: self.id,
            name: self.name.clone(),
            url: self.url.clone(),
        }
    }
}

/// First submission creates the app on the worker; later ones redeploy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    Create,
    Update,
}

impl HostMode {
    pub fn method(&self) -> Method {
        match self {
            HostMode::Create => Method::POST,
            HostMode::Update => Method::PUT,
        }
    }
}

impl fmt::Display for HostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMode::Create => f.write_str("create"),
            HostMode::Update => f.write_str("update"),
        }
    }
}

/// Success body from the worker. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedApp {
    pub id: i32,
    pub port: u16,
    pub image_name: String,
}

/// Error body the worker sends with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamError {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status_code, self.error, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_fields() {
        assert!(matches!(
            HostRequest::new(1, "  ", "https://github.com/a/b"),
            Err(HostingWorkerError::InvalidRequest(_))
        ));
        assert!(matches!(
            HostRequest::new(1, "demo", ""),
            Err(HostingWorkerError::InvalidRequest(_))
        ));
        assert!(HostRequest::new(1, "demo", "https://github.com/a/b").is_ok());
    }

    #[test]
    fn test_request_body_shape() {
        let request = HostRequest::new(3, "demo", "https://github.com/a/b").unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"id": 3, "name": "demo", "url": "https://github.com/a/b"})
        );
    }

    #[test]
    fn test_hosted_app_requires_every_field() {
        let parsed: HostedApp =
            serde_json::from_str(r#"{"id": 1, "port": 8080, "imageName": "img-42"}"#).unwrap();
        assert_eq!(parsed.image_name, "img-42");
        assert!(serde_json::from_str::<HostedApp>(r#"{"id": 1, "port": 8080}"#).is_err());
    }
}
