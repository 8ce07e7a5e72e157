//! HTTP client for a running control server.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::domain::messages::{CommandResponse, KeypressRequest, StatusResponse, TypeRequest};

/// How long to wait for any reply.  `/type` answers only after the whole text
/// has been typed, so this is generous.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for client calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("unexpected reply from {url} (HTTP {status}): {message}")]
    Decode {
        url: String,
        status: u16,
        message: String,
    },
}

/// Talks to one control server.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
    base_url: String,
}

impl ControlClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] if the HTTP client cannot be built.
    pub fn new(host: &str, port: u16) -> Result<Self, ClientError> {
        let base_url = format!("http://{host}:{port}");
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Request {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await;
        decode(&url, response).await
    }

    /// Asks the server to type `text`.  A 400 or 500 reply still decodes to a
    /// [`CommandResponse`] with `success: false`.
    pub async fn type_text(&self, text: &str, delay: f64) -> Result<CommandResponse, ClientError> {
        let url = format!("{}/type", self.base_url);
        let body = TypeRequest {
            text: Some(text.to_string()),
            delay: Some(delay),
        };
        let response = self.client.post(&url).json(&body).send().await;
        decode(&url, response).await
    }

    pub async fn press_key(&self, key: &str) -> Result<CommandResponse, ClientError> {
        let url = format!("{}/keypress", self.base_url);
        let body = KeypressRequest {
            key: Some(key.to_string()),
        };
        let response = self.client.post(&url).json(&body).send().await;
        decode(&url, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Result<reqwest::Response>,
) -> Result<T, ClientError> {
    let request_error = |e: reqwest::Error| ClientError::Request {
        url: url.to_string(),
        message: e.to_string(),
    };
    let response = response.map_err(request_error)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(request_error)?;
    debug!(url, status, "control reply");
    serde_json::from_str(&body).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        status,
        message: e.to_string(),
    })
}
