//! Address trie: group-scoped token tries for address canonicalization.
//!
//! Stages:
//! 1. Construction (count every sequence through a token trie)
//! 2. Codec (QCK2 binary blob)
//! 3. Peel (step-wise removal of common leading blocks)
//! 4. Clean (one-shot removal of the high-count leading run)
//! 5. Lookup / classify / candidates (identifier retrieval)
//! 6. Format (diagnostic rendering)

pub mod clean;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod lookup;
pub mod peel;
pub mod trie;

pub use clean::{clean, clean_with};
pub use config::{CleanParams, EngineConfig, FormatParams, LookupParams, MatchParams, PeelParams, PeelStrategy};
pub use error::{FormatError, Result, TrieError};
pub use format::{format_counts, format_terms};
pub use lookup::{
    classify, find, find_candidates, find_with, CandidateReport, CandidateStatus, MatchReport, MatchStatus, TraceStep,
};
pub use peel::{peel, peel_with};
pub use trie::{Identifier, NodeId, Trie, TrieBuilder, TrieNode};
