//! File-backed memory store.
//!
//! Each session lives in its own directory under the store root:
//!
//! ```text
//! <root>/<session_id>/session.json     session header
//! <root>/<session_id>/messages.jsonl   one StoredMessage per line
//! <root>/<session_id>/summaries.jsonl  one MemoryRecord per line
//! ```
//!
//! Appends go to the end of the JSONL files. Rewrites (flag flips, header
//! updates) write a temp file and rename it over the original.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, NewMessage, Session, StoredMessage};
use crate::store::{MemoryStore, MessageLog, SummaryStore, sort_summaries};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mnemo_rs_protocol::SessionId;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SESSION_FILE: &str = "session.json";
const MESSAGES_FILE: &str = "messages.jsonl";
const SUMMARIES_FILE: &str = "summaries.jsonl";

/// Cached log tails are dropped once this many sessions are tracked.
const CURSOR_CACHE_LIMIT: usize = 1024;

/// Position of the log tail, cached per session after first access.
#[derive(Debug, Clone, Copy)]
struct LogCursor {
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Memory store persisting sessions as JSON/JSONL files.
#[derive(Debug)]
pub struct FileMemoryStore {
    root: PathBuf,
    /// Serializes all file access; also caches each session's log tail.
    cursors: Mutex<HashMap<SessionId, LogCursor>>,
}

impl FileMemoryStore {
    /// Create a store under the given root, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized file memory store (root={})", root.display());
        Ok(Self {
            root,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.root.join(session_id.as_str())
    }

    fn load_session(&self, session_id: &SessionId) -> Result<Option<Session>, MemoryError> {
        let path = self.session_dir(session_id).join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_session(&self, session: &Session) -> Result<(), MemoryError> {
        let dir = self.session_dir(&session.id);
        fs::create_dir_all(&dir)?;
        let contents = serde_json::to_string_pretty(session)?;
        replace_file(&dir.join(SESSION_FILE), contents.as_bytes())
    }

    /// Load the session header, creating it on first use.
    fn ensure_session_locked(&self, session_id: &SessionId) -> Result<Session, MemoryError> {
        if let Some(session) = self.load_session(session_id)? {
            return Ok(session);
        }
        let session = Session::new(session_id.clone(), Utc::now());
        self.write_session(&session)?;
        info!("created session (session_id={})", session_id);
        Ok(session)
    }

    fn load_messages(&self, session_id: &SessionId) -> Result<Vec<StoredMessage>, MemoryError> {
        read_jsonl(&self.session_dir(session_id).join(MESSAGES_FILE))
    }

    fn cursor(
        &self,
        cursors: &mut HashMap<SessionId, LogCursor>,
        session_id: &SessionId,
    ) -> Result<LogCursor, MemoryError> {
        if let Some(cursor) = cursors.get(session_id) {
            return Ok(*cursor);
        }
        let messages = self.load_messages(session_id)?;
        let cursor = LogCursor {
            next_seq: messages.last().map_or(0, |last| last.seq + 1),
            last_timestamp: messages.last().map(|last| last.timestamp),
        };
        if cursors.len() >= CURSOR_CACHE_LIMIT {
            cursors.clear();
        }
        cursors.insert(session_id.clone(), cursor);
        Ok(cursor)
    }
}

#[async_trait]
impl MessageLog for FileMemoryStore {
    async fn ensure_session(&self, session_id: &SessionId) -> Result<Session, MemoryError> {
        let _guard = self.cursors.lock();
        self.ensure_session_locked(session_id)
    }

    async fn session(&self, session_id: &SessionId) -> Result<Option<Session>, MemoryError> {
        let _guard = self.cursors.lock();
        self.load_session(session_id)
    }

    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage, MemoryError> {
        let mut cursors = self.cursors.lock();
        let session_id = message.session_id.clone();
        let mut session = self.ensure_session_locked(&session_id)?;
        let cursor = self.cursor(&mut cursors, &session_id)?;
        let stored = message.into_stored(cursor.next_seq, cursor.last_timestamp);

        // Header first: once the line is in the log the append has happened.
        if stored.timestamp > session.updated_at {
            session.updated_at = stored.timestamp;
            self.write_session(&session)?;
        }
        append_jsonl(
            &self.session_dir(&session_id).join(MESSAGES_FILE),
            &stored,
        )?;
        cursors.insert(
            session_id,
            LogCursor {
                next_seq: stored.seq + 1,
                last_timestamp: Some(stored.timestamp),
            },
        );
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
        let _guard = self.cursors.lock();
        self.load_messages(session_id)
    }

    async fn mark_summarized(
        &self,
        session_id: &SessionId,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        let _guard = self.cursors.lock();
        let mut messages = self.load_messages(session_id)?;
        let flipped = flip_summarized(&mut messages, ids);
        if flipped > 0 {
            rewrite_jsonl(
                &self.session_dir(session_id).join(MESSAGES_FILE),
                &messages,
            )?;
        }
        debug!(
            "marked messages summarized (session_id={}, requested={}, flipped={})",
            session_id,
            ids.len(),
            flipped
        );
        Ok(flipped)
    }
}

#[async_trait]
impl SummaryStore for FileMemoryStore {
    async fn append_summary(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        let _guard = self.cursors.lock();
        self.ensure_session_locked(&record.session_id)?;
        append_jsonl(
            &self.session_dir(&record.session_id).join(SUMMARIES_FILE),
            &record,
        )?;
        debug!(
            "stored summary (session_id={}, summary_len={})",
            record.session_id,
            record.summary.len()
        );
        Ok(())
    }

    async fn list_summaries(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let _guard = self.cursors.lock();
        let mut records: Vec<MemoryRecord> =
            read_jsonl(&self.session_dir(session_id).join(SUMMARIES_FILE))?;
        sort_summaries(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    /// Rewrites the message log, then appends the summary. A failed append
    /// restores the previous log before the error is returned.
    async fn commit_summary(
        &self,
        record: MemoryRecord,
        ids: &[Uuid],
    ) -> Result<usize, MemoryError> {
        let _guard = self.cursors.lock();
        let session_id = record.session_id.clone();
        self.ensure_session_locked(&session_id)?;
        let dir = self.session_dir(&session_id);
        let log_path = dir.join(MESSAGES_FILE);

        let previous = self.load_messages(&session_id)?;
        let mut messages = previous.clone();
        let flipped = flip_summarized(&mut messages, ids);
        if flipped > 0 {
            rewrite_jsonl(&log_path, &messages)?;
        }
        if let Err(err) = append_jsonl(&dir.join(SUMMARIES_FILE), &record) {
            if flipped > 0 {
                warn!(
                    "summary append failed; restoring message log (session_id={}, error={})",
                    session_id, err
                );
                rewrite_jsonl(&log_path, &previous)?;
            }
            return Err(err);
        }
        debug!(
            "committed summary (session_id={}, requested={}, flipped={}, summary_len={})",
            session_id,
            ids.len(),
            flipped,
            record.summary.len()
        );
        Ok(flipped)
    }
}

fn flip_summarized(messages: &mut [StoredMessage], ids: &[Uuid]) -> usize {
    let wanted: HashSet<&Uuid> = ids.iter().collect();
    let mut flipped = 0;
    for message in messages
        .iter_mut()
        .filter(|message| !message.summarized && wanted.contains(&message.id))
    {
        message.summarized = true;
        flipped += 1;
    }
    flipped
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, MemoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), MemoryError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn rewrite_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<(), MemoryError> {
    let mut contents = String::new();
    for record in records {
        contents.push_str(&serde_json::to_string(record)?);
        contents.push('\n');
    }
    replace_file(path, contents.as_bytes())
}

/// Write to a sibling temp file and rename it into place.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), MemoryError> {
    let Some(file_name) = path.file_name() else {
        return Err(MemoryError::Corrupt(format!(
            "invalid store path: {}",
            path.display()
        )));
    };
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{FileMemoryStore, MESSAGES_FILE, SUMMARIES_FILE};
    use crate::{MemoryRecord, MemoryStore, MessageLog, NewMessage, SummaryStore};
    use chrono::{Duration, TimeZone, Utc};
    use mnemo_rs_protocol::{ChatTurn, Role, SessionId};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn session(id: &str) -> SessionId {
        SessionId::parse(id).expect("session id")
    }

    #[tokio::test]
    async fn messages_survive_reopen() {
        let temp = tempdir().expect("tempdir");
        let id = session("s1");
        {
            let store = FileMemoryStore::new(temp.path()).expect("store");
            store
                .append_message(NewMessage::new(id.clone(), Role::User, "remember me"))
                .await
                .expect("append");
            store
                .append_message(NewMessage::new(id.clone(), Role::Assistant, "noted"))
                .await
                .expect("append");
        }

        let store = FileMemoryStore::new(temp.path()).expect("reopen");
        let next = store
            .append_message(NewMessage::new(id.clone(), Role::User, "again"))
            .await
            .expect("append");
        assert_eq!(next.seq, 2);
        let recent = store.recent_messages(&id, 10).await.expect("recent");
        assert_eq!(
            recent,
            vec![
                ChatTurn::user("remember me"),
                ChatTurn::assistant("noted"),
                ChatTurn::user("again"),
            ]
        );
        assert!(store.session(&id).await.expect("session").is_some());
    }

    #[tokio::test]
    async fn recent_window_over_timestamps() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
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
    async fn mark_summarized_rewrites_log_idempotently() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        let id = session("s1");
        let mut ids = Vec::new();
        for content in ["a", "b", "c"] {
            let stored = store
                .append_message(NewMessage::new(id.clone(), Role::User, content))
                .await
                .expect("append");
            ids.push(stored.id);
        }

        assert_eq!(store.mark_summarized(&id, &ids[..2]).await.expect("mark"), 2);
        assert_eq!(store.mark_summarized(&id, &ids[..2]).await.expect("mark"), 0);
        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 1);

        let log_path = temp.path().join("s1").join(MESSAGES_FILE);
        let contents = std::fs::read_to_string(log_path).expect("read log");
        assert_eq!(contents.lines().count(), 3);
        assert!(!temp.path().join("s1").join("messages.jsonl.tmp").exists());

        let pending = store.unsummarized_messages(&id).await.expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ids[2]);
    }

    #[tokio::test]
    async fn embeddings_round_trip_through_disk() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        let id = session("s1");
        store
            .append_message(
                NewMessage::new(id.clone(), Role::User, "vector").with_embedding(vec![0.6, 0.8]),
            )
            .await
            .expect("append");
        store
            .append_message(NewMessage::new(id.clone(), Role::Assistant, "plain"))
            .await
            .expect("append");
        let messages = store.session_messages(&id).await.expect("messages");
        assert_eq!(messages[0].embedding, Some(vec![0.6, 0.8]));
        assert_eq!(messages[1].embedding, None);
    }

    #[tokio::test]
    async fn summaries_append_and_list() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        let id = session("s1");
        store
            .append_summary(MemoryRecord::new(id.clone(), "first"))
            .await
            .expect("append");
        store
            .append_summary(MemoryRecord::new(id.clone(), "second"))
            .await
            .expect("append");
        let summaries = store.list_summaries(&id).await.expect("list");
        let texts: Vec<_> = summaries.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(store
            .list_summaries(&session("other"))
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_batch_pending_and_no_summary() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        let id = session("s1");
        let mut ids = Vec::new();
        for content in ["a", "b", "c"] {
            let stored = store
                .append_message(NewMessage::new(id.clone(), Role::User, content))
                .await
                .expect("append");
            ids.push(stored.id);
        }

        // A directory where the summaries file belongs makes the append fail.
        let summaries_path = temp.path().join("s1").join(SUMMARIES_FILE);
        std::fs::create_dir(&summaries_path).expect("block summaries");
        let err = store
            .commit_summary(MemoryRecord::new(id.clone(), "abc"), &ids)
            .await;
        assert!(err.is_err());
        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 3);

        std::fs::remove_dir(&summaries_path).expect("unblock summaries");
        assert!(store.list_summaries(&id).await.expect("list").is_empty());
        let flipped = store
            .commit_summary(MemoryRecord::new(id.clone(), "abc"), &ids)
            .await
            .expect("commit");
        assert_eq!(flipped, 3);
        assert_eq!(store.count_unsummarized(&id).await.expect("count"), 0);
        assert_eq!(store.list_summaries(&id).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn append_after_failed_header_write_is_not_logged() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        let id = session("s1");
        let first = store
            .append_message(NewMessage::new(id.clone(), Role::User, "first"))
            .await
            .expect("append");

        // Occupy the header's temp path so the rewrite fails.
        let temp_header = temp.path().join("s1").join("session.json.tmp");
        std::fs::create_dir(&temp_header).expect("block header");
        let later = first.timestamp + Duration::seconds(1);
        let result = store
            .append_message(NewMessage::new(id.clone(), Role::User, "second").with_timestamp(later))
            .await;
        assert!(result.is_err());
        assert_eq!(store.session_messages(&id).await.expect("messages").len(), 1);

        std::fs::remove_dir(&temp_header).expect("unblock header");
        let second = store
            .append_message(NewMessage::new(id.clone(), Role::User, "second").with_timestamp(later))
            .await
            .expect("append");
        assert_eq!(second.seq, 1);
    }
}
