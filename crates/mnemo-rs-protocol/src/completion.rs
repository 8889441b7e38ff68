use crate::ChatTurn;
use async_trait::async_trait;

/// Errors surfaced by a chat-completion collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The upstream service answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The upstream answer could not be interpreted as a reply.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Chat-completion collaborator: one request, one reply, no streaming.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a single assistant reply for an ordered list of turns.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError>;
}
