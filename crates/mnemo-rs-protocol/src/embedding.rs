use async_trait::async_trait;

/// Errors surfaced by an embedding backend.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The embedding service answered with a non-success status.
    #[error("embedding service returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response did not contain a usable vector.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Networked text embedding strategy.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
