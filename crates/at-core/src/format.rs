//! Diagnostic rendering of a sequence annotated with trie statistics.
//!
//! Once a token misses, the walk is over: it and every later token are
//! rendered with zero statistics.

use crate::trie::{NodeId, Trie, TrieNode};
use std::fmt::Write;

/// `TOKEN (count)` per token.
pub fn format_counts<T: AsRef<str>>(tokens: &[T], trie: &Trie, separator: &str) -> String {
    annotate(tokens, trie, separator, |out, node| {
        let _ = write!(out, " ({})", node.map_or(0, TrieNode::count));
    })
}

/// `TOKEN (cnt=C term=T)`, with ` id=I` appended on terminal nodes.
pub fn format_terms<T: AsRef<str>>(tokens: &[T], trie: &Trie, separator: &str) -> String {
    annotate(tokens, trie, separator, |out, node| {
        let Some(node) = node else {
            out.push_str(" (cnt=0 term=0)");
            return;
        };
        let _ = write!(out, " (cnt={} term={}", node.count(), node.terminal_count());
        if let Some(id) = node.representative() {
            let _ = write!(out, " id={id}");
        }
        out.push(')');
    })
}

fn annotate<T, F>(tokens: &[T], trie: &Trie, separator: &str, mut label: F) -> String
where
    T: AsRef<str>,
    F: FnMut(&mut String, Option<&TrieNode>),
{
    let mut out = String::new();
    let mut at = Some(NodeId::ROOT);
    for (i, tok) in tokens.iter().enumerate() {
        let tok = tok.as_ref();
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(tok);
        at = at.and_then(|id| trie.child(id, tok));
        label(&mut out, at.map(|id| trie.node(id)));
    }
    out
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
    fn test_counts_full_path() {
        let trie = scenario();
        assert_eq!(
            format_counts(&["LONDON", "STREET", "HIGH", "12"], &trie, " -> "),
            "LONDON (3) -> STREET (2) -> HIGH (2) -> 12 (1)"
        );
    }

    #[test]
    fn test_counts_zero_after_miss() {
        let trie = scenario();
        // HIGH exists under ROAD, but the walk is over once LOW misses.
        assert_eq!(
            format_counts(&["LONDON", "LOW", "HIGH"], &trie, " "),
            "LONDON (3) LOW (0) HIGH (0)"
        );
        assert_eq!(format_counts(&["PARIS"], &trie, " -> "), "PARIS (0)");
    }

    #[test]
    fn test_terms() {
        let trie = scenario();
        assert_eq!(
            format_terms(&["LONDON", "ROAD", "HIGH", "10", "FLAT"], &trie, " -> "),
            "LONDON (cnt=3 term=0) -> ROAD (cnt=1 term=0) -> HIGH (cnt=1 term=0) -> 10 (cnt=1 term=1 id=3) -> FLAT (cnt=0 term=0)"
        );
    }

    #[test]
    fn test_empty_sequence() {
        let trie = scenario();
        let empty: [&str; 0] = [];
        assert_eq!(format_counts(&empty, &trie, " -> "), "");
        assert_eq!(format_terms(&empty, &trie, " -> "), "");
    }

    #[test]
    fn test_empty_trie_zero_annotations() {
        let trie = Trie::new();
        assert_eq!(format_terms(&["A", "B"], &trie, ","), "A (cnt=0 term=0),B (cnt=0 term=0)");
        assert_eq!(format_counts(&["A", "B"], &trie, ","), "A (0),B (0)");
    }
}
