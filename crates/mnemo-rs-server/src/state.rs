use mnemo_rs_core::ConversationMemory;
use std::sync::Arc;
use std::time::Instant;

/// Shared state handed to every route.
pub struct AppState {
    pub memory: Arc<ConversationMemory>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(memory: Arc<ConversationMemory>) -> Self {
        Self {
            memory,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
