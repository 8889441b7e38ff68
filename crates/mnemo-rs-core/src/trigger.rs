//! Policy deciding when a summarization pass runs.

use crate::error::MnemoCoreError;
use log::debug;
use mnemo_rs_memory::{MemoryStore, StoredMessage};
use mnemo_rs_protocol::SessionId;

/// Level-triggered summarization policy, checked after every user message.
///
/// The pending count is measured in rounds: unsummarized user messages. The
/// trigger fires when that count is a positive multiple of `threshold`, or
/// whenever it exceeds `threshold`. The second case only arises after a
/// pass failed or was skipped, so the leftover batch is retried on the next
/// check instead of waiting for the count to realign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizationTrigger {
    threshold: usize,
    min_batch: usize,
}

impl SummarizationTrigger {
    pub fn new(threshold: usize, min_batch: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            min_batch,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether `rounds` pending rounds call for a pass.
    pub fn should_fire(&self, rounds: usize) -> bool {
        rounds > 0 && (rounds % self.threshold == 0 || rounds > self.threshold)
    }

    /// Read the pending state and return the batch to summarize, if any.
    pub async fn check(
        &self,
        store: &dyn MemoryStore,
        session_id: &SessionId,
    ) -> Result<Option<Vec<StoredMessage>>, MnemoCoreError> {
        let rounds = store.count_unsummarized_rounds(session_id).await?;
        if !self.should_fire(rounds) {
            return Ok(None);
        }
        let batch = store.unsummarized_messages(session_id).await?;
        if batch.len() < self.min_batch {
            debug!(
                "skipping summarization, batch too small (session_id={}, batch={}, min={})",
                session_id,
                batch.len(),
                self.min_batch
            );
            return Ok(None);
        }
        debug!(
            "summarization triggered (session_id={}, rounds={}, batch={})",
            session_id,
            rounds,
            batch.len()
        );
        Ok(Some(batch))
    }
}
