//! Test helpers shared across Mnemo crates.

pub mod completion;
pub mod embedding;
pub mod llm;
pub mod memory;

pub use completion::{FailingCompletion, ScriptedCompletion};
pub use embedding::{FailingEmbedding, StaticEmbedding, TableEmbedding};
pub use llm::{FailingLLM, FixedChatResponse, FixedLLM, RecordingChatLLM};
pub use memory::{FailingStore, FlakyCommitStore};
