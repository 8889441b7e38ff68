//! Text embedding with a deterministic local fallback.

mod http;
mod llm;

pub use http::HttpEmbeddingBackend;
pub use llm::LlmEmbeddingBackend;

use log::{debug, warn};
use mnemo_rs_protocol::EmbeddingBackend;
use std::sync::Arc;

/// Dimension of the local fallback embedding.
pub const FALLBACK_DIMENSION: usize = 128;

/// Embeds text through a primary backend, falling back to a local
/// character histogram whenever the backend is absent or fails.
///
/// `embed` never fails: transport errors, non-success statuses, malformed
/// bodies and empty or non-finite vectors all route to the fallback.
#[derive(Clone, Default)]
pub struct EmbeddingProvider {
    primary: Option<Arc<dyn EmbeddingBackend>>,
}

impl EmbeddingProvider {
    pub fn new(primary: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    /// Provider that only ever uses the local fallback.
    pub fn local() -> Self {
        Self { primary: None }
    }

    /// Name of the primary backend, or `local`.
    pub fn backend_name(&self) -> &str {
        self.primary
            .as_ref()
            .map_or("local", |backend| backend.name())
    }

    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let Some(primary) = &self.primary else {
            return fallback_embedding(text);
        };
        match primary.embed(text).await {
            Ok(vector) if is_usable(&vector) => {
                debug!(
                    "embedded text (backend={}, dims={})",
                    primary.name(),
                    vector.len()
                );
                vector
            }
            Ok(vector) => {
                warn!(
                    "embedding backend returned unusable vector; using fallback (backend={}, dims={})",
                    primary.name(),
                    vector.len()
                );
                fallback_embedding(text)
            }
            Err(err) => {
                warn!(
                    "embedding backend failed; using fallback (backend={}, error={})",
                    primary.name(),
                    err
                );
                fallback_embedding(text)
            }
        }
    }
}

fn is_usable(vector: &[f32]) -> bool {
    !vector.is_empty() && vector.iter().all(|value| value.is_finite())
}

/// Deterministic local embedding.
///
/// Each character increments bucket `code_point % 128`; the histogram is
/// then divided by its Euclidean norm. Text without characters yields the
/// zero vector.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let mut buckets = vec![0.0f32; FALLBACK_DIMENSION];
    for ch in text.chars() {
        buckets[(ch as u32 as usize) % FALLBACK_DIMENSION] += 1.0;
    }
    let norm = buckets.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut buckets {
            *value /= norm;
        }
    }
    buckets
}
