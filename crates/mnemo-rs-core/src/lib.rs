//! Memory engine for Mnemo: embeddings, semantic retrieval, summarization
//! policy, prompt assembly, and per-session turn orchestration.

pub mod completion;
pub mod context;
pub mod embedding;
pub mod error;
pub mod locks;
pub mod manager;
pub mod retriever;
pub mod summarizer;
pub mod trigger;

pub use completion::LlmCompletionClient;
pub use context::{ContextAssembler, DEFAULT_SYSTEM_PROMPT, estimate_context_tokens};
pub use embedding::{
    EmbeddingProvider, FALLBACK_DIMENSION, HttpEmbeddingBackend, LlmEmbeddingBackend,
    fallback_embedding,
};
pub use error::MnemoCoreError;
pub use locks::SessionLocks;
pub use manager::{ConversationMemory, DEFAULT_SEARCH_LIMIT, MemorySettings};
pub use retriever::{SemanticRetriever, cosine_similarity};
pub use summarizer::{SUMMARY_INSTRUCTION, Summarizer, SummaryOutcome};
pub use trigger::SummarizationTrigger;
