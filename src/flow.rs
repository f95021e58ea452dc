use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::FlowConfig;
use crate::error::{FlowChatError, Result};

/// One turn against the flow server: message text in, reply text out.
#[async_trait]
pub trait FlowBackend: Send + Sync {
    async fn run(&self, message: &str) -> Result<String>;
}

/// Wire payload for a single run. Built fresh per call, never persisted.
#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    input_value: &'a str,
    output_type: &'a str,
    input_type: &'a str,
}

impl<'a> RunRequest<'a> {
    pub fn chat(message: &'a str) -> Self {
        Self {
            input_value: message,
            output_type: "chat",
            input_type: "chat",
        }
    }
}

/// Typed view of the flow server's run response. The only field this
/// system relies on is `outputs[0].outputs[0].results.message.text`;
/// everything is optional so a deviation decodes and then fails with a
/// named schema error instead of a deep-path panic.
#[derive(Debug, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    outputs: Vec<RunOutputs>,
}

#[derive(Debug, Default, Deserialize)]
struct RunOutputs {
    #[serde(default)]
    outputs: Vec<ComponentOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentOutput {
    results: Option<ComponentResults>,
}

#[derive(Debug, Deserialize)]
struct ComponentResults {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    text: Option<String>,
}

impl RunResponse {
    /// Unwraps the reply at `outputs[0].outputs[0].results.message.text`.
    pub fn reply_text(self) -> Result<String> {
        let run = self
            .outputs
            .into_iter()
            .next()
            .ok_or_else(|| schema("outputs is empty"))?;
        let component = run
            .outputs
            .into_iter()
            .next()
            .ok_or_else(|| schema("outputs[0].outputs is empty"))?;
        let results = component
            .results
            .ok_or_else(|| schema("results is missing"))?;
        let message = results
            .message
            .ok_or_else(|| schema("results.message is missing"))?;
        message
            .text
            .ok_or_else(|| schema("results.message.text is missing"))
    }
}

fn schema(detail: &str) -> FlowChatError {
    FlowChatError::Schema(detail.to_string())
}

/// HTTP client for the flow server's run endpoint. One attempt per turn:
/// no retry, no backoff, no timeout override.
pub struct FlowClient {
    http: reqwest::Client,
    config: FlowConfig,
}

impl FlowClient {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl FlowBackend for FlowClient {
    async fn run(&self, message: &str) -> Result<String> {
        let url = self.config.run_url();
        // The credential travels only as a header; it is never logged.
        info!(url = %url, "flow request");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(&RunRequest::chat(message))
            .send()
            .await
            .map_err(|e| FlowChatError::Transport(e.to_string()))?;

        let status = response.status();
        info!(url = %url, status = %status.as_u16(), "flow response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowChatError::Transport(format!(
                "flow server returned {}: {}",
                status.as_u16(),
                snippet(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FlowChatError::Transport(e.to_string()))?;
        let decoded: RunResponse = serde_json::from_str(&body)
            .map_err(|e| FlowChatError::Schema(format!("response is not valid JSON: {e}")))?;
        decoded.reply_text()
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
