use async_trait::async_trait;
use mnemo_rs_protocol::{EmbeddingBackend, EmbeddingError};
use std::collections::HashMap;

/// Returns the same vector for every input.
#[derive(Debug, Clone)]
pub struct StaticEmbedding {
    vector: Vec<f32>,
}

impl StaticEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingBackend for StaticEmbedding {
    fn name(&self) -> &str {
        "static"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector.clone())
    }
}

/// Looks vectors up by exact text; unknown texts fail.
#[derive(Debug, Clone, Default)]
pub struct TableEmbedding {
    vectors: HashMap<String, Vec<f32>>,
}

impl TableEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingBackend for TableEmbedding {
    fn name(&self) -> &str {
        "table"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Malformed(format!("no vector for {text:?}")))
    }
}

#[derive(Debug, Clone)]
pub struct FailingEmbedding {
    message: String,
}

impl FailingEmbedding {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for FailingEmbedding {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Transport(self.message.clone()))
    }
}
