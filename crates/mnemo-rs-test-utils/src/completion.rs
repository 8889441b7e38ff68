use async_trait::async_trait;
use mnemo_rs_protocol::{ChatTurn, CompletionClient, CompletionError};
use parking_lot::Mutex;
use std::sync::Arc;

type Handler = dyn Fn(&[ChatTurn]) -> Result<String, CompletionError> + Send + Sync;

/// Completion client that records every prompt and answers through a handler.
#[derive(Clone)]
pub struct ScriptedCompletion {
    handler: Arc<Handler>,
    calls: Arc<Mutex<Vec<Vec<ChatTurn>>>>,
}

impl ScriptedCompletion {
    /// Always answer with the same reply.
    pub fn new(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::with_handler(move |_| Ok(reply.clone()))
    }

    pub fn with_handler(
        handler: impl Fn(&[ChatTurn]) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every prompt received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<Vec<ChatTurn>> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        self.calls.lock().push(turns.to_vec());
        (self.handler)(turns)
    }
}

#[derive(Debug, Clone)]
pub struct FailingCompletion {
    status: u16,
    message: String,
}

impl FailingCompletion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: 503,
            message: message.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _turns: &[ChatTurn]) -> Result<String, CompletionError> {
        Err(CompletionError::Status {
            status: self.status,
            body: self.message.clone(),
        })
    }
}
