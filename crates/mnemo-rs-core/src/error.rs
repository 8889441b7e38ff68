//! Error types for the core memory engine.

use mnemo_rs_memory::MemoryError;
use mnemo_rs_protocol::CompletionError;
use thiserror::Error;

/// Errors returned by conversation memory operations.
#[derive(Debug, Error)]
pub enum MnemoCoreError {
    /// Caller-supplied input was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The completion collaborator failed to produce a reply.
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
    /// The memory store failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}
