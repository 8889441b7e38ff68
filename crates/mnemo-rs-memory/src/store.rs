//! Storage contracts for the short-term message log and the long-term
//! summary tier.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, NewMessage, Session, StoredMessage};
use async_trait::async_trait;
use mnemo_rs_protocol::{ChatTurn, Role, SessionId};
use uuid::Uuid;

/// Append-only per-session message log.
///
/// Backends implement the primitives; the derived queries have default
/// implementations built on [`MessageLog::session_messages`] which backends
/// may override when they can answer more cheaply.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Create the session if it does not exist yet and return it.
    async fn ensure_session(&self, session_id: &SessionId) -> Result<Session, MemoryError>;

    /// Fetch session metadata, if the session exists.
    async fn session(&self, session_id: &SessionId) -> Result<Option<Session>, MemoryError>;

    /// Append a message, creating the session on first use and advancing
    /// its `updated_at`.
    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage, MemoryError>;

    /// All messages of a session in insertion order.
    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, MemoryError>;

    /// Flag the given messages as summarized.
    ///
    /// The flip is applied as one batch and is idempotent: ids that are
    /// already summarized or unknown to the session are ignored. Returns the
    /// number of messages that changed state.
    async fn mark_summarized(
        &self,
        session_id: &SessionId,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError>;

    /// Number of messages not yet folded into a summary.
    async fn count_unsummarized(&self, session_id: &SessionId) -> Result<usize, MemoryError> {
        let messages = self.session_messages(session_id).await?;
        Ok(messages.iter().filter(|message| !message.summarized).count())
    }

    /// Number of unsummarized user messages, i.e. pending conversation rounds.
    async fn count_unsummarized_rounds(
        &self,
        session_id: &SessionId,
    ) -> Result<usize, MemoryError> {
        let messages = self.session_messages(session_id).await?;
        Ok(messages
            .iter()
            .filter(|message| !message.summarized && message.role == Role::User)
            .count())
    }

    /// The newest `limit` messages of the session, returned oldest first.
    /// Summarized messages are included.
    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, MemoryError> {
        let messages = self.session_messages(session_id).await?;
        Ok(newest_first_window(messages, limit))
    }

    /// Every unsummarized message of the session in insertion order.
    async fn unsummarized_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        let mut messages = self.session_messages(session_id).await?;
        messages.retain(|message| !message.summarized);
        Ok(messages)
    }
}

/// Append-only store of long-term summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Persist a summary record.
    async fn append_summary(&self, record: MemoryRecord) -> Result<(), MemoryError>;

    /// All summaries of a session, oldest first.
    async fn list_summaries(&self, session_id: &SessionId)
    -> Result<Vec<MemoryRecord>, MemoryError>;
}

/// A complete memory backend: message log plus summary tier.
#[async_trait]
pub trait MemoryStore: MessageLog + SummaryStore {
    /// Persist `record` and mark `ids` summarized as a single commit.
    ///
    /// Either both effects become visible or neither does, so a failed
    /// commit leaves the batch pending without an orphaned summary. Returns
    /// the number of messages that changed state.
    async fn commit_summary(&self, record: MemoryRecord, ids: &[Uuid])
    -> Result<usize, MemoryError>;
}

/// Rank by (timestamp desc, seq desc), keep `limit`, then restore
/// chronological order.
pub(crate) fn newest_first_window(mut messages: Vec<StoredMessage>, limit: usize) -> Vec<ChatTurn> {
    messages.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.seq.cmp(&a.seq))
    });
    messages.truncate(limit);
    messages.reverse();
    messages
        .into_iter()
        .map(|message| ChatTurn::new(message.role, message.content))
        .collect()
}

/// Stable chronological sort for summaries; ties keep insertion order.
pub(crate) fn sort_summaries(records: &mut [MemoryRecord]) {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
