//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! Implements the role-oracle port. Retry happens here, around connection
//! establishment: once a stream is open, a mid-stream failure is final for
//! that invocation.

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::{classify_status, classify_transport};
use super::retry::RetryPolicy;
use super::sse::sse_token_stream;
use crate::domain::models::{OracleConfig, RetryConfig};
use crate::domain::ports::{OracleError, OracleRequest, RoleOracle, TokenStream};

pub struct OracleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl OracleClient {
    pub fn new(oracle: &OracleConfig, retry: &RetryConfig) -> Result<Self> {
        if oracle.api_key.is_empty() {
            bail!("Oracle API key is not set. Set oracle.api_key or PRODMIND_ORACLE__API_KEY");
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(oracle.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: oracle.base_url.trim_end_matches('/').to_string(),
            api_key: oracle.api_key.clone(),
            model: oracle.model.clone(),
            max_tokens: oracle.max_tokens,
            retry: RetryPolicy::from_config(retry),
        })
    }

    fn body(&self, request: &OracleRequest, stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_text() },
                { "role": "user", "content": request.user_message },
            ],
            "temperature": request.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response, OracleError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body_text = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body_text))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait::async_trait]
impl RoleOracle for OracleClient {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let body = self.body(&request, false);
        self.retry
            .run(|| async {
                let response = self.send(&body).await?;
                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| OracleError::Hard(format!("malformed API response: {e}")))?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| OracleError::Hard("API response had no choices".to_string()))
            })
            .await
    }

    async fn stream(&self, request: OracleRequest) -> Result<TokenStream, OracleError> {
        let body = self.body(&request, true);
        let response = self.retry.run(|| self.send(&body)).await?;
        debug!("oracle stream opened");
        Ok(sse_token_stream(response.bytes_stream()))
    }
}
