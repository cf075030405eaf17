//! Cleaning pipeline: raw trie, peel, big trie, clean.
//!
//! 1. Build a raw trie per group from the rows as given.
//! 2. Peel every row against its group's raw trie.
//! 3. Rebuild a big trie per group from the peeled rows.
//! 4. Clean every peeled row against its group's big trie.

use crate::error::Result;
use crate::group::{build_groups, AddressRow};
use at_core::{clean, peel, CleanParams, EngineConfig, Identifier, PeelParams};
use serde::Serialize;
use tracing::info;

/// One row after both stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedRecord {
    pub group: String,
    pub id: Identifier,
    pub peeled: Vec<String>,
    pub cleaned: String,
}

/// Pipeline output with statistics.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// In input order.
    pub records: Vec<CleanedRecord>,
    pub groups: usize,
    pub rows: usize,
    pub tokens_in: usize,
    pub tokens_out: usize,
}

impl PipelineResult {
    pub fn ratio(&self) -> f64 {
        if self.tokens_in == 0 { return 1.0; }
        self.tokens_out as f64 / self.tokens_in as f64
    }

    pub fn reduction_pct(&self) -> f64 {
        (1.0 - self.ratio()) * 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleaningPipeline {
    pub peel: PeelParams,
    pub clean: CleanParams,
}

impl CleaningPipeline {
    pub fn new(peel: PeelParams, clean: CleanParams) -> Self {
        Self { peel, clean }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.peel.clone(), config.clean.clone())
    }

    pub fn run(&self, rows: &[AddressRow]) -> Result<PipelineResult> {
        let raw = build_groups(rows)?;
        info!(groups = raw.len(), rows = rows.len(), "built raw tries");

        let peeled: Vec<AddressRow> = rows
            .iter()
            .map(|row| AddressRow {
                group: row.group.clone(),
                id: row.id,
                tokens: raw.get(&row.group)
                    .map_or_else(|| row.tokens.clone(), |trie| peel::peel_with(&row.tokens, trie, &self.peel)),
            })
            .collect();
        let big = build_groups(&peeled)?;
        info!(groups = big.len(), "built big tries from peeled rows");

        let mut tokens_out = 0;
        let records: Vec<CleanedRecord> = peeled
            .into_iter()
            .map(|row| {
                let from = big.get(&row.group).map_or(0, |trie| {
                    clean::dropped_len(&row.tokens, trie, self.clean.drop_above, self.clean.min_keep)
                });
                let kept = &row.tokens[from..];
                tokens_out += kept.len();
                CleanedRecord {
                    cleaned: kept.join(self.clean.joiner.as_str()),
                    group: row.group,
                    id: row.id,
                    peeled: row.tokens,
                }
            })
            .collect();

        let result = PipelineResult {
            groups: raw.len(),
            rows: rows.len(),
            tokens_in: rows.iter().map(|r| r.tokens.len()).sum(),
            tokens_out,
            records,
        };
        info!(
            rows = result.rows,
            tokens_in = result.tokens_in,
            tokens_out = result.tokens_out,
            "cleaning pipeline done"
        );
        Ok(result)
    }
}
