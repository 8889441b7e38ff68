//! Folds a batch of unsummarized messages into one long-term summary.

use crate::error::MnemoCoreError;
use log::info;
use mnemo_rs_memory::{MemoryRecord, MemoryStore, StoredMessage};
use mnemo_rs_protocol::{ChatTurn, CompletionClient, CompletionError, SessionId};
use std::sync::Arc;

/// System instruction sent with every summarization request.
pub const SUMMARY_INSTRUCTION: &str = "You maintain the long-term memory of a conversation. \
Summarize the transcript you are given concisely. Extract: \
(a) salient facts about the user, \
(b) the topics discussed, \
(c) any decisions or conclusions reached. \
Write the summary in the same language the conversation is held in. \
Reply with the summary only.";

/// Render a batch as `"{Role}: {content}"` lines in the given order.
pub fn render_transcript(batch: &[StoredMessage]) -> String {
    batch
        .iter()
        .map(|message| format!("{}: {}", message.role.label(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt sent to the completion collaborator for one batch.
pub fn summary_prompt(batch: &[StoredMessage]) -> Vec<ChatTurn> {
    vec![
        ChatTurn::system(SUMMARY_INSTRUCTION),
        ChatTurn::user(render_transcript(batch)),
    ]
}

/// Result of one summarization pass.
#[derive(Debug)]
pub enum SummaryOutcome {
    /// The summary was stored and the batch marked.
    Stored(MemoryRecord),
    /// The completion call failed; nothing was persisted or marked.
    Failed(CompletionError),
}

#[derive(Clone)]
pub struct Summarizer {
    completion: Arc<dyn CompletionClient>,
    store: Arc<dyn MemoryStore>,
}

impl Summarizer {
    pub fn new(completion: Arc<dyn CompletionClient>, store: Arc<dyn MemoryStore>) -> Self {
        Self { completion, store }
    }

    /// Summarize `batch`, then store the summary and mark exactly the batch
    /// in one commit.
    ///
    /// A completion failure or an empty reply is reported as
    /// [`SummaryOutcome::Failed`] and leaves the store untouched. A failed
    /// commit is returned as an error and also leaves the batch pending.
    pub async fn run(
        &self,
        session_id: &SessionId,
        batch: &[StoredMessage],
    ) -> Result<SummaryOutcome, MnemoCoreError> {
        let reply = match self.completion.complete(&summary_prompt(batch)).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                return Ok(SummaryOutcome::Failed(CompletionError::Malformed(
                    "empty summary".to_string(),
                )));
            }
            Err(err) => return Ok(SummaryOutcome::Failed(err)),
        };

        let record = MemoryRecord::new(session_id.clone(), reply.trim());
        let ids: Vec<_> = batch.iter().map(|message| message.id).collect();
        let marked = self.store.commit_summary(record.clone(), &ids).await?;
        info!(
            "stored conversation summary (session_id={}, batch={}, marked={}, summary_len={})",
            session_id,
            batch.len(),
            marked,
            record.summary.len()
        );
        Ok(SummaryOutcome::Stored(record))
    }
}
