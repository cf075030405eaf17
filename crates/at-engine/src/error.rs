use at_core::{FormatError, TrieError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error("Worker thread panicked while building group {group:?}")]
    Worker { group: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<FormatError> for EngineError {
    fn from(e: FormatError) -> Self {
        Self::Trie(TrieError::Format(e))
    }
}

impl EngineError {
    /// The blob-level rejection, if this error came from decoding.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Self::Trie(TrieError::Format(e)) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
