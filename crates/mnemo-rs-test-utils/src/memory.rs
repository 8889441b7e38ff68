use async_trait::async_trait;
use mnemo_rs_memory::{
    MemoryError, MemoryRecord, MemoryStore, MessageLog, NewMessage, Session, StoredMessage,
    SummaryStore,
};
use mnemo_rs_protocol::{ChatTurn, SessionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Store whose every operation fails with an IO error.
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }

    fn error() -> MemoryError {
        MemoryError::Io(std::io::Error::other("store offline"))
    }
}

#[async_trait]
impl MessageLog for FailingStore {
    async fn ensure_session(&self, _session_id: &SessionId) -> Result<Session, MemoryError> {
        Err(Self::error())
    }

    async fn session(&self, _session_id: &SessionId) -> Result<Option<Session>, MemoryError> {
        Err(Self::error())
    }

    async fn append_message(&self, _message: NewMessage) -> Result<StoredMessage, MemoryError> {
        Err(Self::error())
    }

    async fn session_messages(
        &self,
        _session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        Err(Self::error())
    }

    async fn mark_summarized(
        &self,
        _session_id: &SessionId,
        _ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        Err(Self::error())
    }
}

#[async_trait]
impl SummaryStore for FailingStore {
    async fn append_summary(&self, _record: MemoryRecord) -> Result<(), MemoryError> {
        Err(Self::error())
    }

    async fn list_summaries(
        &self,
        _session_id: &SessionId,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        Err(Self::error())
    }
}

#[async_trait]
impl MemoryStore for FailingStore {
    async fn commit_summary(
        &self,
        _record: MemoryRecord,
        _ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        Err(Self::error())
    }
}

/// Wraps a store and rejects its first `failures` summary commits.
pub struct FlakyCommitStore {
    inner: Arc<dyn MemoryStore>,
    remaining_failures: AtomicUsize,
}

impl FlakyCommitStore {
    pub fn new(inner: Arc<dyn MemoryStore>, failures: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl MessageLog for FlakyCommitStore {
    async fn ensure_session(&self, session_id: &SessionId) -> Result<Session, MemoryError> {
        self.inner.ensure_session(session_id).await
    }

    async fn session(&self, session_id: &SessionId) -> Result<Option<Session>, MemoryError> {
        self.inner.session(session_id).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage, MemoryError> {
        self.inner.append_message(message).await
    }

    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        self.inner.session_messages(session_id).await
    }

    async fn mark_summarized(
        &self,
        session_id: &SessionId,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        self.inner.mark_summarized(session_id, ids).await
    }

    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, MemoryError> {
        self.inner.recent_messages(session_id, limit).await
    }
}

#[async_trait]
impl SummaryStore for FlakyCommitStore {
    async fn append_summary(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        self.inner.append_summary(record).await
    }

    async fn list_summaries(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.inner.list_summaries(session_id).await
    }
}

#[async_trait]
impl MemoryStore for FlakyCommitStore {
    async fn commit_summary(
        &self,
        record: MemoryRecord,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MemoryError::Io(std::io::Error::other("commit rejected")));
        }
        self.inner.commit_summary(record, ids).await
    }
}
