//! Process-local memory store.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, NewMessage, Session, StoredMessage};
use crate::store::{MemoryStore, MessageLog, SummaryStore, newest_first_window, sort_summaries};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use mnemo_rs_protocol::{ChatTurn, Role, SessionId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug)]
struct SessionState {
    session: Session,
    messages: Vec<StoredMessage>,
    summaries: Vec<MemoryRecord>,
}

impl SessionState {
    fn new(id: SessionId) -> Self {
        Self {
            session: Session::new(id, Utc::now()),
            messages: Vec::new(),
            summaries: Vec::new(),
        }
    }

    fn flip_summarized(&mut self, ids: &[Uuid]) -> usize {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut flipped = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|message| !message.summarized && wanted.contains(&message.id))
        {
            message.summarized = true;
            flipped += 1;
        }
        flipped
    }
}

/// Memory store backed by in-process maps. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure against a session's messages.
    fn with_messages<T>(&self, session_id: &SessionId, f: impl FnOnce(&[StoredMessage]) -> T) -> T {
        let sessions = self.sessions.read();
        let messages = sessions
            .get(session_id)
            .map(|state| state.messages.as_slice())
            .unwrap_or_default();
        f(messages)
    }
}

#[async_trait]
impl MessageLog for InMemoryStore {
    async fn ensure_session(&self, session_id: &SessionId) -> Result<Session, MemoryError> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionState::new(session_id.clone()));
        Ok(state.session.clone())
    }

    async fn session(&self, session_id: &SessionId) -> Result<Option<Session>, MemoryError> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .map(|state| state.session.clone()))
    }

    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage, MemoryError> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(message.session_id.clone())
            .or_insert_with(|| SessionState::new(message.session_id.clone()));
        let last = state.messages.last();
        let seq = last.map_or(0, |last| last.seq + 1);
        let stored = message.into_stored(seq, last.map(|last| last.timestamp));
        state.session.updated_at = state.session.updated_at.max(stored.timestamp);
        state.messages.push(stored.clone());
        debug!(
            "appended message (session_id={}, role={}, seq={}, tokens={})",
            stored.session_id, stored.role, stored.seq, stored.tokens
        );
        Ok(stored)
    }

    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        Ok(self.with_messages(session_id, <[StoredMessage]>::to_vec))
    }

    async fn mark_summarized(
        &self,
        session_id: &SessionId,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        let flipped = self
            .sessions
            .write()
            .get_mut(session_id)
            .map_or(0, |state| state.flip_summarized(ids));
        debug!(
            "marked messages summarized (session_id={}, requested={}, flipped={})",
            session_id,
            ids.len(),
            flipped
        );
        Ok(flipped)
    }

    async fn count_unsummarized(&self, session_id: &SessionId) -> Result<usize, MemoryError> {
        Ok(self.with_messages(session_id, |messages| {
            messages.iter().filter(|message| !message.summarized).count()
        }))
    }

    async fn count_unsummarized_rounds(
        &self,
        session_id: &SessionId,
    ) -> Result<usize, MemoryError> {
        Ok(self.with_messages(session_id, |messages| {
            messages
                .iter()
                .filter(|message| !message.summarized && message.role == Role::User)
                .count()
        }))
    }

    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, MemoryError> {
        let messages = self.with_messages(session_id, |messages| {
            let start = messages.len().saturating_sub(limit);
            messages[start..].to_vec()
        });
        Ok(newest_first_window(messages, limit))
    }
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn append_summary(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(record.session_id.clone())
            .or_insert_with(|| SessionState::new(record.session_id.clone()));
        debug!(
            "stored summary (session_id={}, summary_len={})",
            record.session_id,
            record.summary.len()
        );
        state.summaries.push(record);
        Ok(())
    }

    async fn list_summaries(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut records = self
            .sessions
            .read()
            .get(session_id)
            .map(|state| state.summaries.clone())
            .unwrap_or_default();
        sort_summaries(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn commit_summary(
        &self,
        record: MemoryRecord,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(record.session_id.clone())
            .or_insert_with(|| SessionState::new(record.session_id.clone()));
        let flipped = state.flip_summarized(ids);
        debug!(
            "committed summary (session_id={}, requested={}, flipped={}, summary_len={})",
            record.session_id,
            ids.len(),
            flipped,
            record.summary.len()
        );
        state.summaries.push(record);
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use crate::{MemoryRecord, MemoryStore, MessageLog, NewMessage, SummaryStore};
    use chrono::{Duration, TimeZone, Utc};
    use mnemo_rs_protocol::{ChatTurn, Role, SessionId};
    use pretty_assertions::assert_eq;

    fn session(id: &str) -> SessionId {
        SessionId::parse(id).expect("session id")
    }

    #[tokio::test]
    async fn append_creates_session_and_advances_updated_at() {
        let store = InMemoryStore::new();
        let id = session("s1");
        assert!(store.session(&id).await.expect("session").is_none());

        let first = store
            .append_message(NewMessage::new(id.clone(), Role::User, "hello"))
            .await
            .expect("append");
        let created = store.session(&id).await.expect("session").expect("exists");
        assert_eq!(created.updated_at, first.timestamp);

        let later = first.timestamp + Duration::seconds(5);
        store
            .append_message(NewMessage::new(id.clone(), Role::Assistant, "hi").with_timestamp(later))
            .await
            .expect("append");
        let updated = store.session(&id).await.expect("session").expect("exists");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, later);

        let again = store.ensure_session(&id).await.expect("ensure");
        assert_eq!(again.created_at, created.created_at);
    }

    #[tokio::test]
    async fn recent_returns_newest_window_oldest_first() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("ts");
        for n in 1..=5 {
            store
                .append_message(
                    NewMessage::new(id.clone(), Role::User, n.to_string())
                        .with_timestamp(base + Duration::seconds(n)),
                )
                .await
                .expect("append");
        }
        let recent = store.recent_messages(&id, 4).await.expect("recent");
        let contents: Vec<_> = recent.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn recent_breaks_timestamp_ties_by_insertion_order() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("ts");
        for (role, content) in [(Role::User, "q"), (Role::Assistant, "a"), (Role::User, "q2")] {
            store
                .append_message(NewMessage::new(id.clone(), role, content).with_timestamp(ts))
                .await
                .expect("append");
        }
        let recent = store.recent_messages(&id, 2).await.expect("recent");
        assert_eq!(
            recent,
            vec![ChatTurn::assistant("a"), ChatTurn::user("q2")]
        );
    }

    #[tokio::test]
    async fn recent_includes_summarized_messages() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let stored = store
            .append_message(NewMessage::new(id.clone(), Role::User, "old"))
            .await
            .expect("append");
        store
            .mark_summarized(&id, &[stored.id])
            .await
            .expect("mark");
        let recent = store.recent_messages(&id, 10).await.expect("recent");
        assert_eq!(recent, vec![ChatTurn::user("old")]);
    }

    #[tokio::test]
    async fn mark_summarized_is_idempotent_and_scoped() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let other = session("s2");
        let mut ids = Vec::new();
        for content in ["a", "b", "c"] {
            let stored = store
                .append_message(NewMessage::new(id.clone(), Role::User, content))
                .await
                .expect("append");
            ids.push(stored.id);
        }
        store
            .append_message(NewMessage::new(other.clone(), Role::User, "x"))
            .await
            .expect("append");

        assert_eq!(store.mark_summarized(&id, &ids[..2]).await.expect("mark"), 2);
        assert_eq!(store.mark_summarized(&id, &ids[..2]).await.expect("mark"), 0);
        assert_eq!(store.mark_summarized(&other, &ids).await.expect("mark"), 0);

        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 1);
        assert_eq!(store.count_unsummarized(&other).await.expect("count"), 1);
        let pending = store.unsummarized_messages(&id).await.expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content, "c");
    }

    #[tokio::test]
    async fn rounds_count_only_unsummarized_user_messages() {
        let store = InMemoryStore::new();
        let id = session("s1");
        for n in 0..3 {
            store
                .append_message(NewMessage::new(id.clone(), Role::User, format!("q{n}")))
                .await
                .expect("append");
            store
                .append_message(NewMessage::new(id.clone(), Role::Assistant, format!("a{n}")))
                .await
                .expect("append");
        }
        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 6);
        assert_eq!(store.count_unsummarized_rounds(&id).await.expect("rounds"), 3);
    }

    #[tokio::test]
    async fn summaries_list_in_creation_order() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let base = Utc::now();
        let mut late = MemoryRecord::new(id.clone(), "second");
        late.created_at = base + Duration::seconds(10);
        let mut early = MemoryRecord::new(id.clone(), "first");
        early.created_at = base;
        store.append_summary(late).await.expect("append");
        store.append_summary(early).await.expect("append");

        let summaries = store.list_summaries(&id).await.expect("list");
        let texts: Vec<_> = summaries.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(store
            .list_summaries(&session("s2"))
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn commit_summary_stores_record_and_marks_batch_together() {
        let store = InMemoryStore::new();
        let id = session("s1");
        let mut ids = Vec::new();
        for content in ["a", "b", "c"] {
            let stored = store
                .append_message(NewMessage::new(id.clone(), Role::User, content))
                .await
                .expect("append");
            ids.push(stored.id);
        }

        let flipped = store
            .commit_summary(MemoryRecord::new(id.clone(), "a and b"), &ids[..2])
            .await
            .expect("commit");
        assert_eq!(flipped, 2);
        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 1);
        let summaries = store.list_summaries(&id).await.expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].summary, "a and b");
    }
}
