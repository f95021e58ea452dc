use serde::{Deserialize, Serialize};

use crate::flow::FlowBackend;

/// Characters of extracted text shown in the upload preview. The full
/// text is what gets transmitted.
pub const PREVIEW_CHARS: usize = 1000;

pub const ERROR_PREFIX: &str = "⚠️ Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat log record. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The most recent upload, waiting for an explicit send action.
#[derive(Debug, Clone)]
pub enum PendingUpload {
    /// Only the filename travels upstream, never pixel data.
    Image { filename: String },
    /// Extracted text; transmitted verbatim on send.
    Text { filename: String, text: String },
}

impl PendingUpload {
    pub fn filename(&self) -> &str {
        match self {
            Self::Image { filename } | Self::Text { filename, .. } => filename,
        }
    }

    pub fn preview(&self) -> String {
        match self {
            Self::Image { .. } => String::new(),
            Self::Text { text, .. } => preview(text),
        }
    }
}

/// Per-session state: the append-only chat log plus at most one pending
/// upload. Lives for one browser session; only `clear` truncates the log.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    pending: Option<PendingUpload>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn set_pending(&mut self, upload: PendingUpload) {
        self.pending = Some(upload);
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    /// Runs one turn: appends the user record, performs the single
    /// blocking call, appends the assistant record (reply text on
    /// success, in-band error text on failure), and returns the
    /// assistant content. Every turn appends exactly two records.
    pub async fn submit(&mut self, backend: &dyn FlowBackend, text: impl Into<String>) -> String {
        let text = text.into();
        self.messages.push(Message {
            role: Role::User,
            content: text.clone(),
        });

        let reply = match backend.run(&text).await {
            Ok(reply) => reply,
            Err(err) => format!("{ERROR_PREFIX}: {err}"),
        };

        self.messages.push(Message {
            role: Role::Assistant,
            content: reply.clone(),
        });
        reply
    }
}

/// Synthetic user message sent when an image upload is confirmed.
pub fn image_notice(filename: &str) -> String {
    format!("📷 User uploaded an image: {filename}")
}

/// First `PREVIEW_CHARS` characters, safe on multi-byte boundaries.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlowChatError, Result};
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl FlowBackend for EchoBackend {
        async fn run(&self, message: &str) -> Result<String> {
            Ok(format!("echo: {message}"))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl FlowBackend for FailingBackend {
        async fn run(&self, _message: &str) -> Result<String> {
            Err(FlowChatError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn each_turn_appends_exactly_two_records() {
        let mut session = ChatSession::new();
        session.submit(&EchoBackend, "hello").await;
        session.submit(&EchoBackend, "again").await;

        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "echo: hello");
        assert_eq!(messages[2].content, "again");
        assert_eq!(messages[3].content, "echo: again");
    }

    #[tokio::test]
    async fn failed_turn_stores_error_text_and_session_stays_usable() {
        let mut session = ChatSession::new();
        let reply = session.submit(&FailingBackend, "hello").await;

        assert!(reply.starts_with(ERROR_PREFIX));
        assert!(reply.contains("connection refused"));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, reply);

        session.submit(&EchoBackend, "retry").await;
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.messages()[3].content, "echo: retry");
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let mut session = ChatSession::new();
        session.submit(&EchoBackend, "one").await;
        session.submit(&EchoBackend, "two").await;
        session.clear();
        assert!(session.messages().is_empty());

        session.submit(&EchoBackend, "three").await;
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn image_notice_carries_the_filename() {
        assert_eq!(
            image_notice("cat.png"),
            "📷 User uploaded an image: cat.png"
        );
    }

    #[test]
    fn preview_caps_at_limit() {
        let long = "a".repeat(PREVIEW_CHARS + 500);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("Hello"), "Hello");
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let long = "é".repeat(PREVIEW_CHARS + 10);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn pending_text_preview_is_capped() {
        let upload = PendingUpload::Text {
            filename: "big.txt".to_string(),
            text: "x".repeat(PREVIEW_CHARS * 2),
        };
        assert_eq!(upload.preview().chars().count(), PREVIEW_CHARS);
        assert_eq!(upload.filename(), "big.txt");

        let image = PendingUpload::Image {
            filename: "cat.png".to_string(),
        };
        assert_eq!(image.preview(), "");
    }
}
