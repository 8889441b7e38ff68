use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use mnemo_rs_protocol::{EmbeddingBackend, EmbeddingError};
use std::sync::Arc;

/// Embedding backend that reuses an LLM provider's embedding API.
#[derive(Clone)]
pub struct LlmEmbeddingBackend {
    llm: Arc<dyn LLMProvider>,
}

impl LlmEmbeddingBackend {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl EmbeddingBackend for LlmEmbeddingBackend {
    fn name(&self) -> &str {
        "llm"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self
            .llm
            .embed(vec![text.to_string()])
            .await
            .map_err(|err| EmbeddingError::Transport(err.to_string()))?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("provider returned no vectors".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::LlmEmbeddingBackend;
    use mnemo_rs_protocol::EmbeddingBackend;
    use mnemo_rs_test_utils::{FailingLLM, FixedLLM};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_first_vector() {
        let backend =
            LlmEmbeddingBackend::new(Arc::new(FixedLLM::new("ok").with_embedding(vec![1.0, 0.0])));
        assert_eq!(backend.embed("hi").await.expect("embed"), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn surfaces_provider_errors() {
        let backend = LlmEmbeddingBackend::new(Arc::new(FailingLLM::new("nope")));
        let err = backend.embed("hi").await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
