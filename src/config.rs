use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:7860";

/// Connection settings for the flow server that answers each chat turn.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
    pub api_key: String,
    pub flow_id: String,
    pub base_url: String,
}

impl FlowConfig {
    pub fn new(
        api_key: impl Into<String>,
        flow_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            flow_id: flow_id.into(),
            base_url: base_url.into(),
        }
    }

    /// Endpoint a turn is POSTed to.
    pub fn run_url(&self) -> String {
        format!(
            "{}/api/v1/run/{}",
            self.base_url.trim_end_matches('/'),
            self.flow_id
        )
    }
}
