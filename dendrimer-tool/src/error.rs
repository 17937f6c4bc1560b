use dendrimer_core::{ParseKeyError, StoreError};
use dendrimer_rocks::RocksError;
use dendrimer_state::TransitionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DmrError {
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open store: {0}")]
    Open(#[from] RocksError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError<RocksError>),

    #[error("Invalid snapshot key: {0}")]
    InvalidKey(#[from] ParseKeyError),

    #[error("Invalid token {0:?}: expected source:text")]
    InvalidToken(String),

    #[error("Invalid event on line {line}: {source}")]
    Event {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Event on line {line} rejected: {source}")]
    Transition {
        line: usize,
        source: TransitionError,
    },
}
