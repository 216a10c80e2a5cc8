//! Collaborator client.

use std::time::Duration;

use async_trait::async_trait;
use quizflow_core::gateway::{
    AdaptNarrativeRequest, BranchClassifier, ClassifyBranchRequest, CompleteRequest,
    ExplainRequest, GatewayError, NarrativeAdapter, Recommendation, Recommender, ResultReasoner,
    SaveStepRequest, SelectArchetypeRequest, SessionLog, StartRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("quizflow/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the remote service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Bearer token sent with every request, when set.
    pub api_key: Option<String>,
    /// Client-side request timeout.
    pub timeout: Duration,
}

/// HTTP implementation of every collaborator contract.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: HttpBackend,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionReply {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptReply {
    adapted_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyReply {
    #[serde(default)]
    next_question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExplainReply {
    explanation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest<'a> {
    session_id: &'a str,
}

impl HttpGateway {
    /// Builds a gateway.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                api_key: config.api_key.filter(|k| !k.is_empty()),
            },
        })
    }
}

#[async_trait]
impl SessionLog for HttpGateway {
    async fn start(&self, request: StartRequest) -> Result<String, GatewayError> {
        let reply: SessionReply = self.http.post_json("/sessions/start", &request).await?;
        debug!(session_id = %reply.session_id, "remote session opened");
        Ok(reply.session_id)
    }

    async fn save_step(&self, request: SaveStepRequest) -> Result<(), GatewayError> {
        self.http
            .post_text("/sessions/save-step", &request)
            .await
            .map(drop)
    }

    async fn complete(&self, request: CompleteRequest) -> Result<String, GatewayError> {
        let reply: SessionReply = self.http.post_json("/sessions/complete", &request).await?;
        Ok(reply.session_id)
    }
}

#[async_trait]
impl NarrativeAdapter for HttpGateway {
    async fn adapt(&self, request: AdaptNarrativeRequest) -> Result<String, GatewayError> {
        let reply: AdaptReply = self.http.post_json("/narrative/adapt", &request).await?;
        Ok(reply.adapted_text)
    }
}

#[async_trait]
impl BranchClassifier for HttpGateway {
    async fn classify(
        &self,
        request: ClassifyBranchRequest,
    ) -> Result<Option<String>, GatewayError> {
        let reply: ClassifyReply = self.http.post_json("/branch/classify", &request).await?;
        Ok(reply.next_question_id.filter(|id| !id.is_empty()))
    }
}

#[async_trait]
impl ResultReasoner for HttpGateway {
    async fn explain(&self, request: ExplainRequest) -> Result<String, GatewayError> {
        let reply: ExplainReply = self.http.post_json("/results/explain", &request).await?;
        Ok(reply.explanation)
    }

    async fn select_archetype(
        &self,
        request: SelectArchetypeRequest,
    ) -> Result<String, GatewayError> {
        self.http
            .post_text("/results/select-archetype", &request)
            .await
    }
}

#[async_trait]
impl Recommender for HttpGateway {
    async fn recommend(&self, session_id: &str) -> Result<Recommendation, GatewayError> {
        self.http
            .post_json("/recommendations", &RecommendRequest { session_id })
            .await
    }
}
