use std::sync::Arc;

use clap::Parser;

use flowchat::config::{FlowConfig, DEFAULT_BASE_URL};
use flowchat::error::{FlowChatError, Result};
use flowchat::flow::FlowClient;
use flowchat::logging;
use flowchat::ui::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "flowchat")]
#[command(about = "Single-page chat frontend for a Langflow agentic flow")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:7890")]
    listen: String,

    #[arg(long, env = "LANGFLOW_BASE_URL", default_value_t = DEFAULT_BASE_URL.to_string())]
    base_url: String,

    #[arg(long, env = "LANGFLOW_FLOW_ID")]
    flow_id: String,

    #[arg(long, env = "LANGFLOW_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing("flowchat");

    let cli = Cli::parse();
    let config = FlowConfig::new(cli.api_key, cli.flow_id, cli.base_url);
    let state = AppState::new(Arc::new(FlowClient::new(config)));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .map_err(|e| FlowChatError::Runtime(format!("cannot bind {}: {e}", cli.listen)))?;
    tracing::info!(listen = %cli.listen, "flowchat serving");

    axum::serve(listener, app)
        .await
        .map_err(|e| FlowChatError::Runtime(e.to_string()))?;
    Ok(())
}
