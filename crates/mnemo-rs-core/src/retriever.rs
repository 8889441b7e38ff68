//! Cosine-similarity ranking over a session's stored messages.

use crate::error::MnemoCoreError;
use log::debug;
use mnemo_rs_memory::{MemoryStore, StoredMessage};
use mnemo_rs_protocol::{SearchHit, SessionId};
use std::sync::Arc;

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Ranks every message of a session, summarized or not, against a query
/// embedding.
#[derive(Clone)]
pub struct SemanticRetriever {
    store: Arc<dyn MemoryStore>,
}

impl SemanticRetriever {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    pub async fn rank(
        &self,
        session_id: &SessionId,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, MnemoCoreError> {
        let messages = self.store.session_messages(session_id).await?;
        let candidates = messages.len();
        let hits = rank_messages(messages, query, limit);
        debug!(
            "ranked session messages (session_id={}, candidates={}, returned={})",
            session_id,
            candidates,
            hits.len()
        );
        Ok(hits)
    }
}

/// Score, stable-sort descending and truncate.
///
/// Messages without an embedding, or with one of a different dimension than
/// the query, are skipped.
pub fn rank_messages(messages: Vec<StoredMessage>, query: &[f32], limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = messages
        .into_iter()
        .filter_map(|message| {
            let embedding = message.embedding.as_ref()?;
            if embedding.len() != query.len() {
                return None;
            }
            let score = cosine_similarity(embedding, query);
            Some(SearchHit {
                content: message.content,
                role: message.role,
                score,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::{SemanticRetriever, cosine_similarity, rank_messages};
    use mnemo_rs_memory::{InMemoryStore, MessageLog, NewMessage};
    use mnemo_rs_protocol::{Role, SessionId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session(id: &str) -> SessionId {
        SessionId::parse(id).expect("session id")
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let pairs = [
            (vec![1.0, 2.0, 3.0], vec![-3.0, 0.5, 2.0]),
            (vec![0.1, -0.7], vec![5.0, 5.0]),
            (vec![1.0, 0.0], vec![-1.0, 0.0]),
        ];
        for (a, b) in pairs {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            assert_eq!(ab, ba);
            assert!((-1.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn cosine_self_similarity_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_guards_zero_norm() {
        let zero = vec![0.0; 3];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[tokio::test]
    async fn rank_orders_by_score_with_stable_ties_and_truncates() {
        let store = Arc::new(InMemoryStore::new());
        let id = session("s1");
        let entries = [
            ("orthogonal", vec![0.0, 1.0]),
            ("tie-first", vec![1.0, 0.0]),
            ("partial", vec![1.0, 1.0]),
            ("tie-second", vec![2.0, 0.0]),
        ];
        for (content, vector) in entries {
            store
                .append_message(
                    NewMessage::new(id.clone(), Role::User, content).with_embedding(vector),
                )
                .await
                .expect("append");
        }
        let retriever = SemanticRetriever::new(store.clone());

        let hits = retriever.rank(&id, &[1.0, 0.0], 10).await.expect("rank");
        let contents: Vec<_> = hits.iter().map(|hit| hit.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["tie-first", "tie-second", "partial", "orthogonal"]
        );

        let top = retriever.rank(&id, &[1.0, 0.0], 2).await.expect("rank");
        assert_eq!(top.len(), 2);
        assert_eq!(retriever.rank(&id, &[1.0, 0.0], 0).await.expect("rank").len(), 0);
    }

    #[tokio::test]
    async fn rank_only_considers_the_given_session() {
        let store = Arc::new(InMemoryStore::new());
        store
            .append_message(
                NewMessage::new(session("a"), Role::User, "mine").with_embedding(vec![1.0, 0.0]),
            )
            .await
            .expect("append");
        store
            .append_message(
                NewMessage::new(session("b"), Role::User, "theirs").with_embedding(vec![1.0, 0.0]),
            )
            .await
            .expect("append");
        let retriever = SemanticRetriever::new(store);
        let hits = retriever.rank(&session("a"), &[1.0, 0.0], 5).await.expect("rank");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "mine");
        assert_eq!(hits[0].role, Role::User);
    }

    #[tokio::test]
    async fn rank_includes_summarized_messages() {
        let store = Arc::new(InMemoryStore::new());
        let id = session("s1");
        let stored = store
            .append_message(
                NewMessage::new(id.clone(), Role::Assistant, "archived")
                    .with_embedding(vec![0.0, 1.0]),
            )
            .await
            .expect("append");
        store
            .mark_summarized(&id, &[stored.id])
            .await
            .expect("mark");
        let hits = SemanticRetriever::new(store)
            .rank(&id, &[0.0, 1.0], 5)
            .await
            .expect("rank");
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn rank_skips_missing_and_mismatched_embeddings() {
        let store = InMemoryStore::new();
        let id = session("s1");
        for message in [
            NewMessage::new(id.clone(), Role::User, "no vector"),
            NewMessage::new(id.clone(), Role::User, "wrong dims").with_embedding(vec![1.0]),
            NewMessage::new(id.clone(), Role::User, "match").with_embedding(vec![0.0, 1.0]),
        ] {
            store.append_message(message).await.expect("append");
        }
        let messages = store.session_messages(&id).await.expect("messages");
        let hits = rank_messages(messages, &[0.0, 1.0], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "match");
    }
}
