//! Records persisted by memory stores.

use chrono::{DateTime, Utc};
use mnemo_rs_protocol::{Role, SessionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation container keyed by a caller-supplied identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Advances on every appended message.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One stored utterance.
///
/// Immutable once written except for the `summarized` flag, which only ever
/// goes from `false` to `true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_id: SessionId,
    /// Per-session insertion sequence, used to break timestamp ties.
    pub seq: u64,
    pub role: Role,
    pub content: String,
    /// Heuristic token estimate of `content`.
    pub tokens: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub summarized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Message to append; the store assigns id, sequence and token estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

impl NewMessage {
    /// Message stamped with the current time and no embedding.
    pub fn new(session_id: SessionId, role: Role, content: impl Into<String>) -> Self {
        Self {
            session_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Materialize the stored form.
    ///
    /// `floor` is the timestamp of the previous message in the session; the
    /// stored timestamp never goes below it so that timestamp order stays
    /// consistent with insertion order.
    pub(crate) fn into_stored(self, seq: u64, floor: Option<DateTime<Utc>>) -> StoredMessage {
        let timestamp = match floor {
            Some(floor) if floor > self.timestamp => floor,
            _ => self.timestamp,
        };
        StoredMessage {
            id: Uuid::new_v4(),
            tokens: estimate_tokens(&self.content),
            session_id: self.session_id,
            seq,
            role: self.role,
            content: self.content,
            timestamp,
            summarized: false,
            embedding: self.embedding,
        }
    }
}

/// Long-term summary of a batch of older messages. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub session_id: SessionId,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(session_id: SessionId, summary: impl Into<String>) -> Self {
        Self {
            session_id,
            summary: summary.into(),
            created_at: Utc::now(),
        }
    }
}

/// Heuristic token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
