//! Public SDK surface for Mnemo.
//!
//! This crate re-exports the building blocks and provides the bootstrap
//! helpers the `mnemo` binary uses to turn a config into a running engine.

pub mod bootstrap;

/// Re-export for convenience.
pub use mnemo_rs_config as config;
pub use mnemo_rs_core as core;
/// Re-export for convenience.
pub use mnemo_rs_memory as memory;
/// Re-export for convenience.
pub use mnemo_rs_protocol as protocol;
pub use mnemo_rs_server as server;

pub use bootstrap::{build_embeddings, build_llm, build_memory, open_store};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// Honors `RUST_LOG`; calling it more than once is harmless.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
