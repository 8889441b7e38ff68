//! `mnemo.json5` handling: the `MnemoConfig` schema, allow-list validation
//! and user → cwd → runtime layering.
//!
//! ```no_run
//! use mnemo_rs_config::{LayeredConfigOptions, MnemoConfig};
//!
//! let options = LayeredConfigOptions::new(".").with_runtime_path("deploy/mnemo.json5");
//! let layered = MnemoConfig::load_layered_with_options(options)?;
//! println!("trigger every {} rounds", layered.config.memory.summary_trigger_rounds);
//! # Ok::<(), mnemo_rs_config::ConfigError>(())
//! ```

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
pub use model::*;
