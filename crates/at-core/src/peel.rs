//! Peeling: bounded, step-wise removal of common leading token blocks.
//!
//! Tokens are consumed in slice order, so a caller that wants to peel the
//! end of an address passes its tokens right-to-left.

use crate::config::{PeelParams, PeelStrategy};
use crate::trie::{NodeId, Trie};
use tracing::trace;

/// Peel with the default share strategy.
pub fn peel<T: AsRef<str>>(tokens: &[T], trie: &Trie, max_steps: usize, max_k: usize) -> Vec<String> {
    let params = PeelParams {
        max_steps,
        max_k,
        strategy: PeelStrategy::default(),
    };
    peel_with(tokens, trie, &params)
}

pub fn peel_with<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &PeelParams) -> Vec<String> {
    let start = peeled_len(tokens, trie, params);
    tokens[start..].iter().map(|t| t.as_ref().to_string()).collect()
}

/// How many leading tokens a peel removes. Always leaves at least one.
pub fn peeled_len<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &PeelParams) -> usize {
    let n = tokens.len();
    if n < 2 || params.max_steps == 0 || trie.is_empty() {
        return 0;
    }
    let max_k = params.max_k.max(1);

    let mut start = 0;
    let mut at = NodeId::ROOT;
    for step in 0..params.max_steps {
        let remaining = n - start;
        if remaining < 2 {
            break;
        }
        let try_k = max_k.min(remaining - 1);
        let rest = &tokens[start..];

        let block = match params.strategy {
            PeelStrategy::Share { min_share } => share_block(trie, at, &rest[..try_k], min_share),
            PeelStrategy::Anchor => anchor_block(trie, rest, try_k).map(|k| (k, NodeId::ROOT)),
        };
        let Some((k, next)) = block else {
            break;
        };
        trace!(step, k, start, "peeled block");
        start += k;
        at = next;
    }
    start
}

/// Largest leading block of `window` whose landing node (walked from `at`)
/// holds more than `min_share` of the group. Counts only shrink along a
/// path, so the landing node decides for the whole block.
fn share_block<T: AsRef<str>>(trie: &Trie, at: NodeId, window: &[T], min_share: f64) -> Option<(usize, NodeId)> {
    let threshold = min_share * f64::from(trie.total());
    let path = trie.walk_longest(at, window);
    let k = path
        .iter()
        .take_while(|id| f64::from(trie.node(**id).count()) > threshold)
        .count();
    (k > 0).then(|| (k, path[k - 1]))
}

/// Largest `k <= try_k` such that the token after the block starts more
/// sequences on its own than it continues after the block.
fn anchor_block<T: AsRef<str>>(trie: &Trie, rest: &[T], try_k: usize) -> Option<usize> {
    (1..=try_k).rev().find(|&k| {
        let anchor = rest[k].as_ref();
        let alone = trie
            .child(NodeId::ROOT, anchor)
            .map_or(0, |id| trie.node(id).count());
        let after_block = trie
            .walk(&rest[..k])
            .and_then(|id| trie.child(id, anchor))
            .map_or(0, |id| trie.node(id).count());
        alone > after_block
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Trie {
        Trie::build(vec![
            (1, vec!["LONDON", "STREET", "HIGH", "10"]),
            (2, vec!["LONDON", "STREET", "HIGH", "12"]),
            (3, vec!["LONDON", "ROAD", "HIGH", "10"]),
        ])
    }

    #[test]
    fn test_zero_steps_is_identity() {
        let trie = scenario();
        let seq = ["LONDON", "STREET", "HIGH", "10"];
        assert_eq!(peel(&seq, &trie, 0, 3), seq);
        assert_eq!(peel(&seq, &trie, 0, 0), seq);
    }

    #[test]
    fn test_prefers_largest_block() {
        let trie = scenario();
        let out = peel(&["LONDON", "STREET", "HIGH", "10"], &trie, 1, 2);
        assert_eq!(out, vec!["HIGH", "10"]);
    }

    #[test]
    fn test_continues_from_reached_node() {
        let trie = scenario();
        let out = peel(&["LONDON", "STREET", "HIGH", "10"], &trie, 4, 2);
        assert_eq!(out, vec!["10"]);
    }

    #[test]
    fn test_never_empties() {
        let trie = Trie::build(vec![(1, vec!["A", "B"]), (2, vec!["A", "B"])]);
        let out = peel(&["A", "B"], &trie, 10, 5);
        assert_eq!(out, vec!["B"]);
    }

    #[test]
    fn test_single_and_empty_input() {
        let trie = scenario();
        assert_eq!(peel(&["LONDON"], &trie, 4, 2), vec!["LONDON"]);
        let empty: [&str; 0] = [];
        assert!(peel(&empty, &trie, 4, 2).is_empty());
    }

    #[test]
    fn test_stricter_share_stops_early() {
        let trie = scenario();
        let params = PeelParams {
            max_steps: 4,
            max_k: 2,
            strategy: PeelStrategy::Share { min_share: 0.7 },
        };
        let out = peel_with(&["LONDON", "STREET", "HIGH", "10"], &trie, &params);
        assert_eq!(out, vec!["STREET", "HIGH", "10"]);
    }

    #[test]
    fn test_diverging_tail_uses_reachable_path() {
        let trie = scenario();
        let out = peel(&["LONDON", "AVENUE", "5"], &trie, 4, 2);
        assert_eq!(out, vec!["AVENUE", "5"]);
    }

    #[test]
    fn test_unknown_sequence_untouched() {
        let trie = scenario();
        let out = peel(&["PARIS", "RUE", "1"], &trie, 4, 2);
        assert_eq!(out, vec!["PARIS", "RUE", "1"]);
    }

    #[test]
    fn test_max_k_zero_treated_as_one() {
        let trie = scenario();
        let out = peel(&["LONDON", "STREET", "HIGH", "10"], &trie, 1, 0);
        assert_eq!(out, vec!["STREET", "HIGH", "10"]);
    }

    #[test]
    fn test_empty_trie() {
        let trie = Trie::new();
        assert_eq!(peel(&["A", "B"], &trie, 4, 2), vec!["A", "B"]);
    }

    #[test]
    fn test_anchor_strategy() {
        let trie = Trie::build(vec![
            (1, vec!["UK", "LONDON", "HIGH", "1"]),
            (2, vec!["LONDON", "HIGH", "2"]),
            (3, vec!["LONDON", "HIGH", "3"]),
        ]);
        let params = PeelParams {
            max_steps: 4,
            max_k: 2,
            strategy: PeelStrategy::Anchor,
        };
        let out = peel_with(&["UK", "LONDON", "HIGH", "1"], &trie, &params);
        assert_eq!(out, vec!["LONDON", "HIGH", "1"]);
    }

    #[test]
    fn test_peeled_len() {
        let trie = scenario();
        let params = PeelParams::default();
        assert_eq!(peeled_len(&["LONDON", "STREET", "HIGH", "12"], &trie, &params), 3);
    }
}
