//! flowchat — a single-page chat frontend for a remote agentic flow server.
//!
//! Each user turn (typed text, or text extracted from an uploaded file)
//! becomes one POST to the flow server's run endpoint; the reply is
//! appended to a per-session, append-only chat log.

pub mod config;
pub mod error;
pub mod extract;
pub mod flow;
pub mod logging;
pub mod pdf;
pub mod session;
pub mod ui;

pub use error::{FlowChatError, Result};
