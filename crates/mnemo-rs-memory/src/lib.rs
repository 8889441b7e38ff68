//! Message log and long-term summary storage for Mnemo.

pub mod error;
pub mod file;
pub mod in_memory;
pub mod model;
pub mod store;

/// Memory error type.
pub use error::MemoryError;
/// File-backed store.
pub use file::FileMemoryStore;
/// Process-local store.
pub use in_memory::InMemoryStore;
/// Stored records.
pub use model::{MemoryRecord, NewMessage, Session, StoredMessage, estimate_tokens};
/// Storage contracts.
pub use store::{MemoryStore, MessageLog, SummaryStore};
