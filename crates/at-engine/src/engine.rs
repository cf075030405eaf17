//! Blob-facing operations.
//!
//! Tries cross the boundary as QCK2 blobs. Every read operation resolves its
//! blob through the engine's cache and runs against the shared decoded trie.

use crate::cache::{CacheStats, TrieCache};
use crate::error::Result;
use crate::group::{self, AddressRow};
use at_core::{
    clean, codec, format, lookup, peel, CandidateReport, CleanParams, EngineConfig, Identifier, MatchReport,
    PeelParams, Trie,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Explicit handle carrying configuration and the parsed-trie cache.
#[derive(Debug, Default)]
pub struct TrieEngine {
    config: EngineConfig,
    cache: TrieCache,
}

impl TrieEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache: TrieCache::default(),
        })
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = TrieCache::new(capacity);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Decoded trie for `blob`, shared with the cache.
    pub fn trie(&self, blob: &[u8]) -> Result<Arc<Trie>> {
        self.cache.get_or_parse(blob)
    }

    /// Aggregate one group's rows into a QCK2 blob.
    pub fn build_trie<I, S, T>(&self, group: &str, rows: I) -> Vec<u8>
    where
        I: IntoIterator<Item = (Identifier, S)>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let trie = Trie::build(rows);
        debug!(group, rows = trie.total(), nodes = trie.node_count(), "built trie blob");
        codec::encode(&trie)
    }

    /// One blob per group, groups built in parallel.
    pub fn build_group_blobs(&self, rows: &[AddressRow]) -> Result<BTreeMap<String, Vec<u8>>> {
        let tries = group::build_groups(rows)?;
        Ok(tries
            .into_iter()
            .map(|(group, trie)| (group, codec::encode(&trie)))
            .collect())
    }

    /// Peel with explicit bounds; the decision strategy comes from config.
    pub fn peel_end_tokens<T: AsRef<str>>(
        &self,
        tokens: &[T],
        blob: &[u8],
        max_steps: usize,
        max_k: usize,
    ) -> Result<Vec<String>> {
        let trie = self.trie(blob)?;
        let params = PeelParams {
            max_steps,
            max_k,
            strategy: self.config.peel.strategy,
        };
        Ok(peel::peel_with(tokens, &trie, &params))
    }

    /// Clean with an explicit threshold; joiner and minimum kept tokens
    /// come from config.
    pub fn build_cleaned_address<T: AsRef<str>>(&self, tokens: &[T], blob: &[u8], drop_above: u32) -> Result<String> {
        let trie = self.trie(blob)?;
        let params = CleanParams {
            drop_above,
            ..self.config.clean.clone()
        };
        Ok(clean::clean_with(tokens, &trie, &params))
    }

    pub fn find_address_from_trie<T: AsRef<str>>(
        &self,
        tokens: &[T],
        blob: &[u8],
        exact_only: bool,
        top_k: usize,
    ) -> Result<Vec<Identifier>> {
        let trie = self.trie(blob)?;
        Ok(lookup::find(tokens, &trie, exact_only, top_k))
    }

    pub fn classify_address<T: AsRef<str>>(&self, tokens: &[T], blob: &[u8]) -> Result<MatchReport> {
        let trie = self.trie(blob)?;
        Ok(lookup::classify(tokens, &trie))
    }

    /// Skip-tolerant candidate search under the configured match bounds.
    pub fn find_candidates<T: AsRef<str>>(&self, tokens: &[T], blob: &[u8]) -> Result<CandidateReport> {
        let trie = self.trie(blob)?;
        let report = lookup::find_candidates(tokens, &trie, &self.config.matching);
        debug!(status = report.status.as_str(), ids = report.ids.len(), matched = report.matched_len, "candidate search");
        Ok(report)
    }

    /// The single address the candidate search accepts, if any.
    pub fn find_address<T: AsRef<str>>(&self, tokens: &[T], blob: &[u8]) -> Result<Option<Identifier>> {
        Ok(self.find_candidates(tokens, blob)?.exact())
    }

    /// `None` uses the configured separator.
    pub fn format_address_with_counts<T: AsRef<str>>(
        &self,
        tokens: &[T],
        blob: &[u8],
        separator: Option<&str>,
    ) -> Result<String> {
        let trie = self.trie(blob)?;
        Ok(format::format_counts(tokens, &trie, self.separator(separator)))
    }

    pub fn format_address_with_term<T: AsRef<str>>(
        &self,
        tokens: &[T],
        blob: &[u8],
        separator: Option<&str>,
    ) -> Result<String> {
        let trie = self.trie(blob)?;
        Ok(format::format_terms(tokens, &trie, self.separator(separator)))
    }

    fn separator<'a>(&'a self, separator: Option<&'a str>) -> &'a str {
        separator.unwrap_or(&self.config.format.separator)
    }
}
