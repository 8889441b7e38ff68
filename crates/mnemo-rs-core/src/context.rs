//! Prompt assembly from the long-term and short-term tiers.

use crate::error::MnemoCoreError;
use mnemo_rs_memory::{MemoryStore, estimate_tokens};
use mnemo_rs_protocol::{ChatTurn, SessionId};
use std::sync::Arc;

/// Persona and memory instruction placed first in every prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly assistant with long-term memory. \
You remember what the user told you earlier in this conversation, including details \
condensed into memory summaries, and you use them naturally when they are relevant. \
Answer in the language the user writes in.";

/// Heading that introduces the long-term summaries message.
pub const SUMMARY_HEADING: &str = "Summary of earlier conversation:";

/// Builds the ordered prompt for a turn:
///
/// 1. the system persona instruction,
/// 2. one system message holding every summary, if any exist,
/// 3. the newest `window_rounds * 2` messages with their roles.
#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn MemoryStore>,
    system_prompt: String,
    window_rounds: usize,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn MemoryStore>, window_rounds: usize) -> Self {
        Self {
            store,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            window_rounds,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Messages included in the short-term window.
    pub fn window_size(&self) -> usize {
        self.window_rounds * 2
    }

    pub async fn build(&self, session_id: &SessionId) -> Result<Vec<ChatTurn>, MnemoCoreError> {
        let mut turns = vec![ChatTurn::system(self.system_prompt.clone())];

        let summaries = self.store.list_summaries(session_id).await?;
        if !summaries.is_empty() {
            let joined = summaries
                .iter()
                .map(|record| record.summary.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            turns.push(ChatTurn::system(format!("{SUMMARY_HEADING}\n\n{joined}")));
        }

        turns.extend(
            self.store
                .recent_messages(session_id, self.window_size())
                .await?,
        );
        Ok(turns)
    }
}

/// Heuristic token estimate for a whole prompt.
pub fn estimate_context_tokens(turns: &[ChatTurn]) -> usize {
    turns.iter().map(|turn| estimate_tokens(&turn.content)).sum()
}

#[cfg(test)]
mod tests {
    use super::{ContextAssembler, DEFAULT_SYSTEM_PROMPT, SUMMARY_HEADING, estimate_context_tokens};
    use mnemo_rs_memory::{InMemoryStore, MemoryRecord, MessageLog, NewMessage, SummaryStore};
    use mnemo_rs_protocol::{ChatTurn, Role, SessionId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn store_with_rounds(id: &SessionId, rounds: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for n in 0..rounds {
            store
                .append_message(NewMessage::new(id.clone(), Role::User, format!("q{n}")))
                .await
                .expect("append");
            store
                .append_message(NewMessage::new(id.clone(), Role::Assistant, format!("a{n}")))
                .await
                .expect("append");
        }
        store
    }

    #[tokio::test]
    async fn omits_summary_message_without_summaries() {
        let id = SessionId::parse("s1").expect("session");
        let store = store_with_rounds(&id, 1).await;
        let context = ContextAssembler::new(store, 6)
            .build(&id)
            .await
            .expect("build");
        assert_eq!(
            context,
            vec![
                ChatTurn::system(DEFAULT_SYSTEM_PROMPT),
                ChatTurn::user("q0"),
                ChatTurn::assistant("a0"),
            ]
        );
    }

    #[tokio::test]
    async fn includes_one_summary_message_before_window() {
        let id = SessionId::parse("s1").expect("session");
        let store = store_with_rounds(&id, 1).await;
        store
            .append_summary(MemoryRecord::new(id.clone(), "first summary"))
            .await
            .expect("summary");
        store
            .append_summary(MemoryRecord::new(id.clone(), "second summary"))
            .await
            .expect("summary");

        let context = ContextAssembler::new(store, 6)
            .build(&id)
            .await
            .expect("build");
        assert_eq!(context.len(), 4);
        assert_eq!(
            context[1],
            ChatTurn::system(format!(
                "{SUMMARY_HEADING}\n\nfirst summary\n\nsecond summary"
            ))
        );
        let system_count = context
            .iter()
            .filter(|turn| turn.role == Role::System)
            .count();
        assert_eq!(system_count, 2);
        assert_eq!(context[2], ChatTurn::user("q0"));
    }

    #[tokio::test]
    async fn window_is_limited_to_twice_the_rounds() {
        let id = SessionId::parse("s1").expect("session");
        let store = store_with_rounds(&id, 8).await;
        let assembler = ContextAssembler::new(store, 6).with_system_prompt("Be brief.");
        let context = assembler.build(&id).await.expect("build");
        assert_eq!(assembler.window_size(), 12);
        assert_eq!(context.len(), 13);
        assert_eq!(context[0], ChatTurn::system("Be brief."));
        assert_eq!(context[1], ChatTurn::user("q2"));
        assert_eq!(context[12], ChatTurn::assistant("a7"));
    }

    #[test]
    fn token_estimate_sums_turns() {
        let turns = vec![ChatTurn::system("abcd"), ChatTurn::user("abcde")];
        assert_eq!(estimate_context_tokens(&turns), 3);
    }
}
