//! Turn orchestration over the memory tiers.

use crate::context::{ContextAssembler, estimate_context_tokens};
use crate::embedding::EmbeddingProvider;
use crate::error::MnemoCoreError;
use crate::locks::SessionLocks;
use crate::retriever::SemanticRetriever;
use crate::summarizer::{Summarizer, SummaryOutcome};
use crate::trigger::SummarizationTrigger;
use log::{debug, info, warn};
use mnemo_rs_config::MnemoConfig;
use mnemo_rs_memory::{MemoryStore, NewMessage};
use mnemo_rs_protocol::{
    CompletionClient, Role, SearchHit, SessionId, SummaryView, TurnResponse, TurnStats,
};
use std::sync::Arc;

/// Result count used when a search does not name a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Tunables for the memory engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySettings {
    /// Rounds kept verbatim in the prompt.
    pub short_term_rounds: usize,
    /// Pending rounds that trigger a summarization pass.
    pub summary_trigger_rounds: usize,
    /// Smallest batch worth summarizing.
    pub min_summary_batch: usize,
    /// Overrides the built-in persona instruction.
    pub system_prompt: Option<String>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            short_term_rounds: 6,
            summary_trigger_rounds: 10,
            min_summary_batch: 5,
            system_prompt: None,
        }
    }
}

impl From<&MnemoConfig> for MemorySettings {
    fn from(config: &MnemoConfig) -> Self {
        Self {
            short_term_rounds: config.memory.short_term_rounds,
            summary_trigger_rounds: config.memory.summary_trigger_rounds,
            min_summary_batch: config.memory.min_summary_batch,
            system_prompt: config.assistant.system_prompt.clone(),
        }
    }
}

/// Bounded conversational memory for one assistant.
///
/// Each turn runs inside the session's critical section:
/// append user message, check the trigger, optionally summarize, assemble
/// the prompt, call the completion collaborator, append the reply. The
/// inbound message is embedded before the section is entered.
pub struct ConversationMemory {
    store: Arc<dyn MemoryStore>,
    embeddings: EmbeddingProvider,
    completion: Arc<dyn CompletionClient>,
    trigger: SummarizationTrigger,
    summarizer: Summarizer,
    assembler: ContextAssembler,
    retriever: SemanticRetriever,
    locks: SessionLocks,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embeddings: EmbeddingProvider,
        completion: Arc<dyn CompletionClient>,
        settings: MemorySettings,
    ) -> Self {
        let mut assembler = ContextAssembler::new(store.clone(), settings.short_term_rounds);
        if let Some(system_prompt) = settings.system_prompt {
            assembler = assembler.with_system_prompt(system_prompt);
        }
        info!(
            "conversation memory ready (embedding={}, short_term_rounds={}, summary_trigger_rounds={})",
            embeddings.backend_name(),
            settings.short_term_rounds,
            settings.summary_trigger_rounds
        );
        Self {
            trigger: SummarizationTrigger::new(
                settings.summary_trigger_rounds,
                settings.min_summary_batch,
            ),
            summarizer: Summarizer::new(completion.clone(), store.clone()),
            retriever: SemanticRetriever::new(store.clone()),
            assembler,
            store,
            embeddings,
            completion,
            locks: SessionLocks::new(),
        }
    }

    pub fn store(&self) -> Arc<dyn MemoryStore> {
        self.store.clone()
    }

    /// Process one user turn and return the assistant reply.
    ///
    /// A completion failure is returned as an error; the user message stays
    /// in the log and no assistant message is written. Summarization
    /// failures are logged and do not affect the turn.
    pub async fn submit_turn(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<TurnResponse, MnemoCoreError> {
        if message.trim().is_empty() {
            return Err(MnemoCoreError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        let embedding = self.embeddings.embed(message).await;

        let _guard = self.locks.acquire(session_id).await;
        self.store
            .append_message(
                NewMessage::new(session_id.clone(), Role::User, message).with_embedding(embedding),
            )
            .await?;

        let summarized = self.maybe_summarize(session_id).await?;

        let context = self.assembler.build(session_id).await?;
        let context_tokens = estimate_context_tokens(&context);
        debug!(
            "assembled context (session_id={}, messages={}, tokens={})",
            session_id,
            context.len(),
            context_tokens
        );

        let reply = match self.completion.complete(&context).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    "completion failed (session_id={}, error={})",
                    session_id, err
                );
                return Err(err.into());
            }
        };

        let reply_embedding = self.embeddings.embed(&reply).await;
        self.store
            .append_message(
                NewMessage::new(session_id.clone(), Role::Assistant, reply.clone())
                    .with_embedding(reply_embedding),
            )
            .await?;

        let stats = TurnStats {
            unsummarized_messages: self.store.count_unsummarized(session_id).await?,
            summary_count: self.store.list_summaries(session_id).await?.len(),
            context_messages: context.len(),
            context_tokens,
            summarized,
        };
        Ok(TurnResponse {
            reply,
            session_id: session_id.clone(),
            debug: stats,
        })
    }

    /// Run the trigger check and, when it fires, one summarization pass.
    /// Returns whether a summary was stored.
    async fn maybe_summarize(&self, session_id: &SessionId) -> Result<bool, MnemoCoreError> {
        let Some(batch) = self.trigger.check(self.store.as_ref(), session_id).await? else {
            return Ok(false);
        };
        match self.summarizer.run(session_id, &batch).await? {
            SummaryOutcome::Stored(_) => Ok(true),
            SummaryOutcome::Failed(err) => {
                warn!(
                    "summarization failed; batch left for the next check (session_id={}, batch={}, error={})",
                    session_id,
                    batch.len(),
                    err
                );
                Ok(false)
            }
        }
    }

    /// Rank a session's messages by similarity to `query`.
    pub async fn search(
        &self,
        session_id: &SessionId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, MnemoCoreError> {
        if query.trim().is_empty() {
            return Err(MnemoCoreError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }
        let embedding = self.embeddings.embed(query).await;
        self.retriever.rank(session_id, &embedding, limit).await
    }

    /// Long-term summaries of a session, oldest first.
    pub async fn summaries(&self, session_id: &SessionId) -> Result<Vec<SummaryView>, MnemoCoreError> {
        let records = self.store.list_summaries(session_id).await?;
        Ok(records
            .into_iter()
            .map(|record| SummaryView {
                summary: record.summary,
                created_at: record.created_at,
            })
            .collect())
    }
}
