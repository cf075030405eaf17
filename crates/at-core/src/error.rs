use thiserror::Error;

/// Rejection reasons for a QCK2 blob. Any of these aborts decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Bad magic: expected \"QCK2\", found {found:02x?}")]
    BadMagic { found: Vec<u8> },
    #[error("Unsupported flags byte: {0:#04x}")]
    UnsupportedFlags(u8),
    #[error("Truncated {what} at offset {offset}: need {need} bytes, {remaining} remaining")]
    Truncated {
        what: &'static str,
        offset: usize,
        need: usize,
        remaining: usize,
    },
    #[error("Token at offset {offset} is not valid UTF-8")]
    InvalidToken { offset: usize },
    #[error("Duplicate sibling token {token:?} at offset {offset}")]
    DuplicateToken { token: String, offset: usize },
    #[error("{count} trailing bytes after root node")]
    TrailingBytes { count: usize },
}

#[derive(Error, Debug)]
pub enum TrieError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Invariant violated at node {node}: {reason}")]
    Invariant { node: usize, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrieError>;
