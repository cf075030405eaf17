//! Per-group construction.
//!
//! Groups share nothing, so each one is built on its own worker. Inside a
//! large group the rows can be sharded and the partial tries merged.

use crate::error::{EngineError, Result};
use anyhow::Context;
use at_core::{Identifier, Trie, TrieBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use tracing::debug;

/// One address record as it enters the engine: already normalized and
/// tokenized, already assigned to its locality group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRow {
    pub group: String,
    pub id: Identifier,
    pub tokens: Vec<String>,
}

impl AddressRow {
    pub fn new<S: AsRef<str>>(group: impl Into<String>, id: Identifier, tokens: &[S]) -> Self {
        Self {
            group: group.into(),
            id,
            tokens: tokens.iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }

    /// Serialize to JSONL line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_jsonl(line: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Rows from JSONL content, one `AddressRow` per non-blank line.
pub fn load_rows_jsonl(content: &str) -> Result<Vec<AddressRow>> {
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        let row = AddressRow::from_jsonl(line).with_context(|| format!("bad address row on line {}", i + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<AddressRow>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    load_rows_jsonl(&content)
}

/// Rows of each group, in arrival order.
pub fn partition(rows: &[AddressRow]) -> BTreeMap<&str, Vec<&AddressRow>> {
    let mut groups: BTreeMap<&str, Vec<&AddressRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.group.as_str()).or_default().push(row);
    }
    groups
}

fn workers(jobs: usize) -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(jobs)
        .max(1)
}

/// One trie per group, built in parallel across groups.
pub fn build_groups(rows: &[AddressRow]) -> Result<BTreeMap<String, Trie>> {
    let groups: Vec<(&str, Vec<&AddressRow>)> = partition(rows).into_iter().collect();
    if groups.is_empty() {
        return Ok(BTreeMap::new());
    }
    let chunk = groups.len().div_ceil(workers(groups.len()));

    thread::scope(|s| -> Result<BTreeMap<String, Trie>> {
        let handles: Vec<_> = groups
            .chunks(chunk)
            .map(|batch| {
                let handle = s.spawn(move || {
                    batch
                        .iter()
                        .map(|(group, rows)| {
                            let trie = Trie::build(rows.iter().map(|r| (r.id, &r.tokens)));
                            debug!(group, rows = rows.len(), nodes = trie.node_count(), "built group trie");
                            (group.to_string(), trie)
                        })
                        .collect::<Vec<_>>()
                });
                (batch[0].0, handle)
            })
            .collect();

        // Join every worker before reporting, so no panic escapes the scope.
        let joined: Vec<_> = handles.into_iter().map(|(first, h)| (first, h.join())).collect();
        let mut out = BTreeMap::new();
        for (first, built) in joined {
            let built = built.map_err(|_| EngineError::Worker {
                group: first.to_string(),
            })?;
            out.extend(built);
        }
        Ok(out)
    })
}

/// Build one group's trie from `shards` partial tries merged together.
/// Equal to `Trie::build(rows)`, including representatives.
pub fn build_sharded<S: AsRef<str> + Sync>(group: &str, rows: &[(Identifier, Vec<S>)], shards: usize) -> Result<Trie> {
    let shards = shards.clamp(1, rows.len().max(1));
    if shards == 1 {
        return Ok(Trie::build(rows.iter().map(|(id, toks)| (*id, toks))));
    }
    let chunk = rows.len().div_ceil(shards);

    let partials = thread::scope(|s| {
        let handles: Vec<_> = rows
            .chunks(chunk)
            .enumerate()
            .map(|(i, part)| {
                s.spawn(move || {
                    let mut builder = TrieBuilder::with_rank_offset((i * chunk) as u64);
                    for (id, toks) in part {
                        builder.insert(*id, toks);
                    }
                    builder.finish()
                })
            })
            .collect();
        let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        joined.into_iter().collect::<std::result::Result<Vec<Trie>, _>>()
    })
    .map_err(|_| EngineError::Worker {
        group: group.to_string(),
    })?;

    let mut parts = partials.into_iter();
    let mut trie = parts.next().unwrap_or_default();
    for part in parts {
        trie.merge(&part);
    }
    debug!(group, shards, rows = rows.len(), nodes = trie.node_count(), "merged sharded trie");
    Ok(trie)
}
