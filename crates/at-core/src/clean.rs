//! Final cleaning: one-shot removal of the longest leading run whose trie
//! counts all reach a threshold.

use crate::config::CleanParams;
use crate::trie::{NodeId, Trie};

/// Clean and join with a single space, keeping at least one token.
pub fn clean<T: AsRef<str>>(tokens: &[T], trie: &Trie, drop_above: u32) -> String {
    let params = CleanParams {
        drop_above,
        ..CleanParams::default()
    };
    clean_with(tokens, trie, &params)
}

pub fn clean_with<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &CleanParams) -> String {
    let from = dropped_len(tokens, trie, params.drop_above, params.min_keep);
    join(&tokens[from..], &params.joiner)
}

/// Length of the run `clean` removes: the longest reachable leading run
/// with every count `>= drop_above`, shortened so `min_keep` tokens remain.
pub fn dropped_len<T: AsRef<str>>(tokens: &[T], trie: &Trie, drop_above: u32, min_keep: usize) -> usize {
    let run = trie
        .walk_longest(NodeId::ROOT, tokens)
        .iter()
        .take_while(|id| trie.node(**id).count() >= drop_above)
        .count();
    run.min(tokens.len().saturating_sub(min_keep.max(1)))
}

fn join<T: AsRef<str>>(tokens: &[T], joiner: &str) -> String {
    tokens.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(joiner)
}
