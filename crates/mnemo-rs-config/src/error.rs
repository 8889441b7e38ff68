//! Config loading failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file named by a layer or `--config` could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid json5: {0}")]
    Syntax(#[from] json5::Error),
    /// The merged document did not match `MnemoConfig`.
    #[error("config does not match the mnemo schema: {0}")]
    Shape(#[from] serde_json::Error),
    /// Rejected by the allow-list schema; `path` is `<layer>:<dotted.key>`.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A cross-field rule checked by `MnemoConfig::validate`.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Read a config file, keeping its path in the error.
pub(crate) fn read_config_file(path: &std::path::Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
