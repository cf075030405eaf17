//! Address trie engine: the blob-facing surface over `at-core`.
//!
//! Parts:
//! 1. Engine (explicit handle: config + parsed-trie cache)
//! 2. Cache (LRU of decoded tries keyed by blob hash)
//! 3. Group construction (parallel across groups, sharded within one)
//! 4. Cleaning pipeline (raw trie, peel, big trie, clean)

pub mod cache;
pub mod engine;
pub mod error;
pub mod group;
pub mod pipeline;

pub use cache::{CacheStats, TrieCache};
pub use engine::TrieEngine;
pub use error::{EngineError, Result};
pub use group::{build_groups, build_sharded, load_rows_jsonl, read_rows, AddressRow};
pub use pipeline::{CleanedRecord, CleaningPipeline, PipelineResult};
