use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowChatError>;

#[derive(Debug, Error)]
pub enum FlowChatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("schema mismatch: {0}")]
    Schema(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}
