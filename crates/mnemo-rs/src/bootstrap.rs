//! Wiring from `MnemoConfig` to a ready `ConversationMemory`.

use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use log::{info, warn};
use mnemo_rs_config::{
    EmbeddingConfig, EmbeddingProviderKind, LlmConfig, MemoryConfig, MemoryProviderKind,
    MnemoConfig,
};
use mnemo_rs_core::{
    ConversationMemory, EmbeddingProvider, HttpEmbeddingBackend, LlmCompletionClient,
    LlmEmbeddingBackend, MemorySettings,
};
use mnemo_rs_memory::{FileMemoryStore, InMemoryStore, MemoryStore};
use std::sync::Arc;

/// Open the configured message and summary store.
pub fn open_store(config: &MemoryConfig) -> anyhow::Result<Arc<dyn MemoryStore>> {
    match config.provider {
        MemoryProviderKind::File => {
            let root = config.resolved_path();
            info!("opening file memory store (path={})", root);
            let store = FileMemoryStore::new(&root)
                .with_context(|| format!("failed to open memory store at {root}"))?;
            Ok(Arc::new(store))
        }
        MemoryProviderKind::Memory => {
            warn!("using in-process memory store; history is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Build the completion model from the `llm` block.
///
/// The API key is read from the environment variable named by
/// `llm.api_key_env`.
pub fn build_llm(config: &LlmConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let Ok(api_key) = std::env::var(&config.api_key_env) else {
        bail!("{} is required to run mnemo", config.api_key_env);
    };
    info!(
        "building LLM provider (provider={}, model={})",
        config.provider, config.model
    );
    let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
        .api_key(api_key)
        .model(config.model.clone())
        .build()
        .context("failed to build OpenAI LLM provider")?;
    Ok(llm)
}

/// Build the embedding provider from the `embedding` block.
pub fn build_embeddings(
    config: &EmbeddingConfig,
    llm: &Arc<dyn LLMProvider>,
) -> anyhow::Result<EmbeddingProvider> {
    let provider = match config.provider {
        EmbeddingProviderKind::Local => EmbeddingProvider::local(),
        EmbeddingProviderKind::Llm => {
            EmbeddingProvider::new(Arc::new(LlmEmbeddingBackend::new(llm.clone())))
        }
        EmbeddingProviderKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .context("embedding.endpoint is required for the http provider")?;
            let mut backend = HttpEmbeddingBackend::new(endpoint)
                .context("failed to build http embedding backend")?;
            if let Some(model) = &config.model {
                backend = backend.with_model(model.clone());
            }
            if let Some(env) = &config.api_key_env {
                match std::env::var(env) {
                    Ok(key) => backend = backend.with_api_key(key),
                    Err(_) => warn!("embedding api key variable is not set (env={})", env),
                }
            }
            EmbeddingProvider::new(Arc::new(backend))
        }
    };
    info!("embedding provider ready (backend={})", provider.backend_name());
    Ok(provider)
}

/// Assemble the full memory engine around an already built LLM.
pub fn build_memory(
    config: &MnemoConfig,
    llm: Arc<dyn LLMProvider>,
) -> anyhow::Result<ConversationMemory> {
    let store = open_store(&config.memory)?;
    let embeddings = build_embeddings(&config.embedding, &llm)?;
    let completion = Arc::new(LlmCompletionClient::new(llm));
    Ok(ConversationMemory::new(
        store,
        embeddings,
        completion,
        MemorySettings::from(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::{build_embeddings, build_memory, open_store};
    use autoagents_llm::LLMProvider;
    use mnemo_rs_config::{
        EmbeddingConfig, EmbeddingProviderKind, MemoryConfig, MemoryProviderKind, MnemoConfig,
    };
    use mnemo_rs_protocol::SessionId;
    use mnemo_rs_test_utils::FixedLLM;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn llm() -> Arc<dyn LLMProvider> {
        Arc::new(FixedLLM::new("hello there").with_embedding(vec![1.0, 0.0]))
    }

    #[test]
    fn file_store_is_created_under_configured_path() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("memory");
        let config = MemoryConfig {
            provider: MemoryProviderKind::File,
            path: Some(root.display().to_string()),
            ..MemoryConfig::default()
        };
        open_store(&config).expect("store");
        assert!(root.is_dir());
    }

    #[test]
    fn embedding_provider_follows_config() {
        let local = build_embeddings(&EmbeddingConfig::default(), &llm()).expect("local");
        assert_eq!(local.backend_name(), "local");

        let via_llm = EmbeddingConfig {
            provider: EmbeddingProviderKind::Llm,
            ..EmbeddingConfig::default()
        };
        assert_eq!(
            build_embeddings(&via_llm, &llm()).expect("llm").backend_name(),
            "llm"
        );

        let http = EmbeddingConfig {
            provider: EmbeddingProviderKind::Http,
            endpoint: Some("http://127.0.0.1:9/v1/embeddings".to_string()),
            model: Some("text-embedding-3-small".to_string()),
            api_key_env: Some("MNEMO_TEST_UNSET_EMBEDDING_KEY".to_string()),
        };
        assert_eq!(
            build_embeddings(&http, &llm()).expect("http").backend_name(),
            "http"
        );

        let missing_endpoint = EmbeddingConfig {
            provider: EmbeddingProviderKind::Http,
            ..EmbeddingConfig::default()
        };
        assert!(build_embeddings(&missing_endpoint, &llm()).is_err());
    }

    #[tokio::test]
    async fn built_memory_answers_a_turn() {
        let mut config = MnemoConfig::default();
        config.memory.provider = MemoryProviderKind::Memory;
        let memory = build_memory(&config, llm()).expect("memory");

        let session = SessionId::parse("boot").expect("session");
        let response = memory.submit_turn(&session, "hi").await.expect("turn");
        assert_eq!(response.reply, "hello there");
        assert_eq!(response.debug.unsummarized_messages, 2);
    }
}
