//! HTTP layer: request dispatch and status mapping.
//!
//! This is the only place that interprets status codes or reqwest errors.

use quizflow_core::gateway::GatewayError;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Longest error body carried in `GatewayError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl HttpBackend {
    /// POSTs `body` and decodes a JSON reply.
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.post_text(path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| GatewayError::Malformed(format!("{path}: {e}")))
    }

    /// POSTs `body` and returns the raw reply body.
    pub(crate) async fn post_text<B>(&self, path: &str, body: &B) -> Result<String, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        debug!(%url, status = status.as_u16(), "collaborator replied");

        if status.is_success() {
            Ok(text)
        } else {
            Err(GatewayError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            })
        }
    }
}

fn map_reqwest_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_decode() {
        GatewayError::Malformed(error.to_string())
    } else {
        GatewayError::Transport(error.to_string())
    }
}
