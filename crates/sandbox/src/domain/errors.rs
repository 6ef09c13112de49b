//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} responded with status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown directory '{0}'")]
    UnknownDir(String),

    #[error("unknown source '{path}/{name}'")]
    UnknownSource { path: String, name: String },
}

pub type Result<T> = std::result::Result<T, SandboxError>;
