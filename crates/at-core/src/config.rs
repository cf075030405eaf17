use crate::error::{Result, TrieError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for every read operation, grouped per operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub peel: PeelParams,
    pub clean: CleanParams,
    pub lookup: LookupParams,
    pub matching: MatchParams,
    pub format: FormatParams,
}

/// How a peel step decides that a leading block is common enough to drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeelStrategy {
    /// Drop the block when the node it reaches holds more than
    /// `min_share` of the group's sequences.
    Share { min_share: f64 },
    /// Drop the block when the following token also starts sequences
    /// on its own more often than it follows this block.
    Anchor,
}

impl Default for PeelStrategy {
    fn default() -> Self {
        Self::Share { min_share: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeelParams {
    pub max_steps: usize,
    pub max_k: usize,
    pub strategy: PeelStrategy,
}

impl Default for PeelParams {
    fn default() -> Self {
        Self {
            max_steps: 4,
            max_k: 2,
            strategy: PeelStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanParams {
    pub drop_above: u32,
    pub joiner: String,
    /// Tokens always kept, counted from the far end of the walk.
    pub min_keep: usize,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            drop_above: 40,
            joiner: " ".into(),
            min_keep: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupParams {
    pub exact_only: bool,
    pub top_k: usize,
}

impl Default for LookupParams {
    fn default() -> Self {
        Self {
            exact_only: true,
            top_k: 1,
        }
    }
}

/// Bounds for the skip-tolerant candidate walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// A child reached by skipping must hold more than this many sequences.
    pub skip_min_local_count: u32,
    /// Tokens one walk may skip in total.
    pub skip_max_in_walk: usize,
    /// Tokens a walk must cover before it may accept an address.
    pub min_matched_tokens: usize,
    /// Nodes below the root holding at least this many sequences also seed walks.
    pub entry_min_local_count: u32,
    /// Deepest level searched for seed nodes.
    pub max_trie_entry_depth: usize,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            skip_min_local_count: 10,
            skip_max_in_walk: 2,
            min_matched_tokens: 2,
            entry_min_local_count: 10,
            max_trie_entry_depth: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatParams {
    pub separator: String,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            separator: " -> ".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if let PeelStrategy::Share { min_share } = self.peel.strategy {
            if !(0.0..1.0).contains(&min_share) {
                return Err(TrieError::InvalidConfig(format!(
                    "peel.strategy.min_share must be in [0, 1), got {min_share}"
                )));
            }
        }
        if self.clean.min_keep == 0 {
            return Err(TrieError::InvalidConfig("clean.min_keep must be at least 1".into()));
        }
        Ok(())
    }
}
