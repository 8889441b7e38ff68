//! Completion client backed by an autoagents LLM provider.

use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use log::debug;
use mnemo_rs_protocol::{ChatTurn, CompletionClient, CompletionError, Role};
use std::sync::Arc;

#[derive(Clone)]
pub struct LlmCompletionClient {
    llm: Arc<dyn LLMProvider>,
}

impl LlmCompletionClient {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }
}

fn to_chat_message(turn: &ChatTurn) -> ChatMessage {
    let role = match turn.role {
        Role::System => ChatRole::System,
        Role::User => ChatRole::User,
        Role::Assistant => ChatRole::Assistant,
    };
    ChatMessage {
        role,
        message_type: MessageType::Text,
        content: turn.content.clone(),
    }
}

#[async_trait]
impl CompletionClient for LlmCompletionClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        let messages: Vec<ChatMessage> = turns.iter().map(to_chat_message).collect();
        let response = self
            .llm
            .chat_with_tools(&messages, None, None)
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;
        let text = response
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| CompletionError::Malformed("empty reply".to_string()))?;
        debug!(
            "completion finished (messages={}, reply_len={})",
            messages.len(),
            text.len()
        );
        Ok(text)
    }
}
