//! Identifier lookup by walking a token sequence against a trie.
//!
//! Three read paths share the walk:
//! - `find`: strict exact lookup, or the deepest terminal on the walked prefix
//! - `classify`: diagnostic status of a single walk
//! - `find_candidates`: skip-tolerant walk from several seed nodes, with a trace

use crate::config::{LookupParams, MatchParams};
use crate::trie::{Identifier, NodeId, Trie};
use serde::{Deserialize, Serialize};

/// Up to `top_k` identifiers for `tokens`.
///
/// Exact mode answers only when the whole sequence is a path ending on a
/// terminal. Otherwise the answer is the representative of the deepest
/// terminal on the longest walkable prefix (the root included), or nothing
/// when no node on that prefix is terminal. Either way at most one id.
pub fn find<T: AsRef<str>>(tokens: &[T], trie: &Trie, exact_only: bool, top_k: usize) -> Vec<Identifier> {
    if top_k == 0 {
        return Vec::new();
    }
    if exact_only {
        return trie
            .walk(tokens)
            .and_then(|id| trie.node(id).representative())
            .into_iter()
            .collect();
    }
    deepest_terminal(tokens, trie).into_iter().collect()
}

pub fn find_with<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &LookupParams) -> Vec<Identifier> {
    find(tokens, trie, params.exact_only, params.top_k)
}

fn deepest_terminal<T: AsRef<str>>(tokens: &[T], trie: &Trie) -> Option<Identifier> {
    std::iter::once(NodeId::ROOT)
        .chain(trie.walk_longest(NodeId::ROOT, tokens))
        .filter_map(|id| trie.node(id).representative())
        .last()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Whole sequence consumed, ending on a single terminal.
    Exact,
    /// Whole sequence consumed, but no row ends there.
    Insufficient,
    /// Several rows end there, or the walk stopped where several rows share the path.
    Ambiguous,
    NoPath,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Insufficient => "INSUFFICIENT",
            Self::Ambiguous => "AMBIGUOUS",
            Self::NoPath => "NO_PATH",
        }
    }
}

/// Diagnostic outcome of walking a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub status: MatchStatus,
    pub id: Option<Identifier>,
    pub matched_len: usize,
    pub consumed_all: bool,
    /// Count at the deepest reached node (0 if nothing matched).
    pub node_count: u32,
    pub terminal_count: u32,
}

impl MatchReport {
    pub fn is_terminal(&self) -> bool {
        self.terminal_count > 0
    }

    pub fn is_ambiguous(&self) -> bool {
        self.terminal_count > 1
    }
}

pub fn classify<T: AsRef<str>>(tokens: &[T], trie: &Trie) -> MatchReport {
    let path = trie.walk_longest(NodeId::ROOT, tokens);
    let matched_len = path.len();
    let consumed_all = matched_len == tokens.len();
    let last = path.last().map(|id| trie.node(*id));

    let mut report = MatchReport {
        status: MatchStatus::NoPath,
        id: None,
        matched_len,
        consumed_all,
        node_count: last.map_or(0, |n| n.count()),
        terminal_count: last.map_or(0, |n| n.terminal_count()),
    };
    if tokens.is_empty() {
        return report;
    }

    report.status = match (consumed_all, last) {
        (true, Some(node)) => match node.terminal_count() {
            0 => MatchStatus::Insufficient,
            1 => {
                report.id = node.representative();
                MatchStatus::Exact
            }
            _ => MatchStatus::Ambiguous,
        },
        (false, Some(node)) if node.count() > 1 => MatchStatus::Ambiguous,
        _ => MatchStatus::NoPath,
    };
    report
}

// ========== Candidate search ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    /// One address accepted.
    Exact,
    /// Tokens matched, but no single address could be accepted.
    Impossible,
    /// Nothing matched; candidates are everything under the tightest seed.
    Ambiguous,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Impossible => "IMPOSSIBLE",
            Self::Ambiguous => "AMBIGUOUS",
        }
    }
}

/// One matched token and the count at the node it reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub token: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub ids: Vec<Identifier>,
    pub status: CandidateStatus,
    /// Tokens covered by the chosen walk, skipped ones included.
    pub matched_len: usize,
    pub consumed_all: bool,
    pub trace: Vec<TraceStep>,
}

impl CandidateReport {
    /// The accepted address, if the search ended on one.
    pub fn exact(&self) -> Option<Identifier> {
        match self.status {
            CandidateStatus::Exact => self.ids.first().copied(),
            _ => None,
        }
    }
}

struct Walk {
    node: NodeId,
    consumed: usize,
    exhausted: bool,
    trace: Vec<TraceStep>,
}

enum WalkEnd {
    Accepted(Identifier, Walk),
    Stopped(Walk),
}

/// Skip-tolerant lookup.
///
/// Walks are tried from every start offset and every seed node (the root,
/// plus nodes within `max_trie_entry_depth` holding at least
/// `entry_min_local_count` sequences). A token with no matching child may be
/// skipped when a later token leads to a child holding more than
/// `skip_min_local_count` sequences. The first walk that accepts an address
/// wins. Otherwise the walk covering the most tokens (then the one ending on
/// the smallest count) supplies every terminal below where it stopped.
pub fn find_candidates<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &MatchParams) -> CandidateReport {
    let mut best: Option<Walk> = None;
    if !tokens.is_empty() {
        let seeds = seed_nodes(trie, params);
        for start in 0..tokens.len() {
            for &seed in &seeds {
                match walk_from(tokens, trie, params, seed, start) {
                    WalkEnd::Accepted(id, walk) => return report(vec![id], CandidateStatus::Exact, walk),
                    WalkEnd::Stopped(walk) => {
                        let better = best.as_ref().map_or(true, |b| {
                            walk.consumed > b.consumed
                                || (walk.consumed == b.consumed
                                    && trie.node(walk.node).count() < trie.node(b.node).count())
                        });
                        if better {
                            best = Some(walk);
                        }
                    }
                }
            }
        }
    }

    match best {
        Some(walk) => {
            let ids = trie.terminals_under(walk.node, usize::MAX);
            let status = if walk.consumed == 0 {
                CandidateStatus::Ambiguous
            } else {
                CandidateStatus::Impossible
            };
            report(ids, status, walk)
        }
        None => CandidateReport {
            ids: Vec::new(),
            status: CandidateStatus::Ambiguous,
            matched_len: 0,
            consumed_all: false,
            trace: Vec::new(),
        },
    }
}

fn report(ids: Vec<Identifier>, status: CandidateStatus, walk: Walk) -> CandidateReport {
    CandidateReport {
        ids,
        status,
        matched_len: walk.consumed,
        consumed_all: walk.exhausted,
        trace: walk.trace,
    }
}

/// Root first, then qualifying nodes in stack order.
fn seed_nodes(trie: &Trie, params: &MatchParams) -> Vec<NodeId> {
    let mut seeds = vec![NodeId::ROOT];
    let mut stack = vec![(NodeId::ROOT, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        if depth >= params.max_trie_entry_depth {
            continue;
        }
        for (_, child) in trie.node(id).children() {
            if trie.node(child).count() >= params.entry_min_local_count {
                seeds.push(child);
            }
            stack.push((child, depth + 1));
        }
    }
    seeds
}

fn walk_from<T: AsRef<str>>(tokens: &[T], trie: &Trie, params: &MatchParams, seed: NodeId, start: usize) -> WalkEnd {
    let n = tokens.len();
    let mut node = seed;
    let mut i = start;
    let mut skipped = 0usize;
    let mut trace = Vec::new();

    loop {
        if let Some(id) = accept(trie, params, node, i - start, i == n) {
            let walk = Walk {
                node,
                consumed: i - start,
                exhausted: i == n,
                trace,
            };
            return WalkEnd::Accepted(id, walk);
        }
        if i >= n {
            break;
        }

        let next = match trie.child(node, tokens[i].as_ref()) {
            Some(child) => Some((0, child)),
            None => {
                let budget = params.skip_max_in_walk.saturating_sub(skipped).min(n - 1 - i);
                (1..=budget).find_map(|d| {
                    trie.child(node, tokens[i + d].as_ref())
                        .filter(|c| trie.node(*c).count() > params.skip_min_local_count)
                        .map(|c| (d, c))
                })
            }
        };
        let Some((skip, child)) = next else {
            break;
        };
        skipped += skip;
        i += skip + 1;
        node = child;
        trace.push(TraceStep {
            token: tokens[i - 1].as_ref().to_string(),
            count: trie.node(node).count(),
        });
    }

    WalkEnd::Stopped(Walk {
        node,
        consumed: i - start,
        exhausted: i >= n,
        trace,
    })
}

/// A node is accepted once enough tokens matched and either its subtree holds
/// exactly one address, or it is a single terminal and nothing useful follows.
fn accept(trie: &Trie, params: &MatchParams, id: NodeId, matched: usize, exhausted: bool) -> Option<Identifier> {
    if matched < params.min_matched_tokens {
        return None;
    }
    let node = trie.node(id);
    if node.count() == 1 {
        if let Some(found) = unique_terminal(trie, id) {
            return Some(found);
        }
    }
    if node.terminal_count() == 1 && (exhausted || node.child_count() == 0) {
        return node.representative();
    }
    None
}

/// Follow the only populated child until a single terminal turns up.
fn unique_terminal(trie: &Trie, id: NodeId) -> Option<Identifier> {
    let mut current = Some(id);
    while let Some(at) = current {
        let node = trie.node(at);
        if node.terminal_count() == 1 {
            return node.representative();
        }
        let mut populated = node.children().map(|(_, c)| c).filter(|c| trie.node(*c).count() > 0);
        current = populated.next();
        if populated.next().is_some() {
            return None;
        }
    }
    None
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
    fn test_exact_hit() {
        let trie = scenario();
        assert_eq!(find(&["LONDON", "STREET", "HIGH", "12"], &trie, true, 1), vec![2]);
        assert_eq!(find(&["LONDON", "ROAD", "HIGH", "10"], &trie, true, 5), vec![3]);
    }

    #[test]
    fn test_exact_miss() {
        let trie = scenario();
        assert!(find(&["LONDON", "STREET", "HIGH"], &trie, true, 1).is_empty());
        assert!(find(&["LONDON", "STREET", "HIGH", "14"], &trie, true, 1).is_empty());
    }

    #[test]
    fn test_top_k_zero() {
        let trie = scenario();
        assert!(find(&["LONDON", "STREET", "HIGH", "12"], &trie, true, 0).is_empty());
        assert!(find(&["LONDON"], &trie, false, 0).is_empty());
    }

    #[test]
    fn test_prefix_match_unknown_number_is_empty() {
        let trie = scenario();
        // 14 was never inserted; neighbours under HIGH must not answer.
        assert!(find(&["LONDON", "STREET", "HIGH", "14"], &trie, false, 1).is_empty());
        assert!(find(&["LONDON", "STREET", "HIGH", "14"], &trie, false, 5).is_empty());
        assert!(find(&["LONDON", "ROAD", "LOW"], &trie, false, 5).is_empty());
    }

    #[test]
    fn test_prefix_match_deepest_terminal_on_path() {
        let trie = Trie::build(vec![(9, vec!["A", "B"]), (10, vec!["A", "B", "C", "D"])]);
        assert_eq!(find(&["A", "B", "X"], &trie, false, 2), vec![9]);
        assert_eq!(find(&["A", "B", "C", "X"], &trie, false, 2), vec![9]);
        assert_eq!(find(&["A", "B", "C", "D", "E"], &trie, false, 2), vec![10]);
        assert!(find(&["A", "X"], &trie, false, 2).is_empty());
    }

    #[test]
    fn test_prefix_match_root_only() {
        let trie = scenario();
        assert!(find(&["PARIS"], &trie, false, 3).is_empty());

        let empty: Vec<&str> = Vec::new();
        let with_root = Trie::build(vec![(4, empty.clone()), (5, vec!["A"])]);
        assert_eq!(find(&["Z"], &with_root, false, 3), vec![4]);
        assert_eq!(find(&empty, &with_root, true, 1), vec![4]);
    }

    #[test]
    fn test_classify_exact() {
        let trie = scenario();
        let r = classify(&["LONDON", "STREET", "HIGH", "12"], &trie);
        assert_eq!(r.status, MatchStatus::Exact);
        assert_eq!(r.id, Some(2));
        assert_eq!(r.matched_len, 4);
        assert!(r.consumed_all);
        assert_eq!(r.node_count, 1);
        assert_eq!(r.terminal_count, 1);
    }

    #[test]
    fn test_classify_insufficient() {
        let trie = scenario();
        let r = classify(&["LONDON", "STREET"], &trie);
        assert_eq!(r.status, MatchStatus::Insufficient);
        assert_eq!(r.node_count, 2);
        assert_eq!(r.id, None);
    }

    #[test]
    fn test_classify_ambiguous_duplicates() {
        let trie = Trie::build(vec![(1, vec!["A", "B"]), (2, vec!["A", "B"])]);
        let r = classify(&["A", "B"], &trie);
        assert_eq!(r.status, MatchStatus::Ambiguous);
        assert_eq!(r.terminal_count, 2);
    }

    #[test]
    fn test_classify_partial() {
        let trie = scenario();
        let r = classify(&["LONDON", "STREET", "LOW"], &trie);
        assert_eq!(r.status, MatchStatus::Ambiguous);
        assert_eq!(r.matched_len, 2);
        assert!(!r.consumed_all);

        let r = classify(&["LONDON", "ROAD", "HIGH", "10", "FLAT"], &trie);
        assert_eq!(r.status, MatchStatus::NoPath);
        assert_eq!(r.matched_len, 4);
    }

    #[test]
    fn test_classify_no_path() {
        let trie = scenario();
        let r = classify(&["PARIS"], &trie);
        assert_eq!(r.status, MatchStatus::NoPath);
        assert_eq!(r.matched_len, 0);
        assert_eq!(r.node_count, 0);

        let empty: [&str; 0] = [];
        assert_eq!(classify(&empty, &trie).status, MatchStatus::NoPath);
    }

    #[test]
    fn test_classify_debug_flags() {
        let trie = Trie::build(vec![(1, vec!["A", "B"]), (2, vec!["A", "B"]), (3, vec!["A", "C"])]);
        let r = classify(&["A", "B"], &trie);
        assert!(r.is_terminal());
        assert!(r.is_ambiguous());
        let r = classify(&["A", "C"], &trie);
        assert!(r.is_terminal());
        assert!(!r.is_ambiguous());
        assert!(!classify(&["A"], &trie).is_terminal());
    }

    // ========== Candidate search ==========

    fn locality() -> Trie {
        Trie::build(vec![
            (100, vec!["KENT", "ASHFORD", "MILL", "LANE", "1"]),
            (101, vec!["KENT", "ASHFORD", "MILL", "LANE", "2"]),
            (102, vec!["KENT", "ASHFORD", "MILL", "LANE", "3"]),
            (103, vec!["KENT", "ASHFORD", "CHURCH", "ROAD", "7"]),
            (104, vec!["KENT", "WYE", "CHURCH", "ROAD", "9"]),
        ])
    }

    fn trace_tokens(report: &CandidateReport) -> Vec<&str> {
        report.trace.iter().map(|s| s.token.as_str()).collect()
    }

    #[test]
    fn test_candidates_exact_full_walk() {
        let trie = locality();
        let r = find_candidates(&["KENT", "ASHFORD", "MILL", "LANE", "2"], &trie, &MatchParams::default());
        assert_eq!(r.status, CandidateStatus::Exact);
        assert_eq!(r.ids, vec![101]);
        assert_eq!(r.exact(), Some(101));
        assert_eq!(r.matched_len, 5);
        assert!(r.consumed_all);
        let counts: Vec<u32> = r.trace.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![5, 4, 3, 3, 1]);
    }

    #[test]
    fn test_candidates_unique_terminal_below() {
        let trie = locality();
        // CHURCH under ASHFORD holds one address, so the rest of the path is implied.
        let r = find_candidates(&["KENT", "ASHFORD", "CHURCH"], &trie, &MatchParams::default());
        assert_eq!(r.exact(), Some(103));
        assert_eq!(r.matched_len, 3);

        let r = find_candidates(&["KENT", "WYE"], &trie, &MatchParams::default());
        assert_eq!(r.exact(), Some(104));
    }

    #[test]
    fn test_candidates_leaf_terminal_ignores_trailing() {
        let trie = locality();
        let r = find_candidates(&["KENT", "ASHFORD", "MILL", "LANE", "1", "FLAT"], &trie, &MatchParams::default());
        assert_eq!(r.exact(), Some(100));
        assert_eq!(r.matched_len, 5);
        assert!(!r.consumed_all);
    }

    #[test]
    fn test_candidates_skip_noise_token() {
        let trie = locality();
        let seq = ["KENT", "ASHFORD", "FLAT", "MILL", "LANE", "3"];
        let params = MatchParams {
            skip_min_local_count: 2,
            ..Default::default()
        };
        let r = find_candidates(&seq, &trie, &params);
        assert_eq!(r.exact(), Some(102));
        assert_eq!(r.matched_len, 6);
        assert_eq!(trace_tokens(&r), vec!["KENT", "ASHFORD", "MILL", "LANE", "3"]);

        // MILL (3) is not above the default skip floor, so the walk stops at ASHFORD.
        let r = find_candidates(&seq, &trie, &MatchParams::default());
        assert_eq!(r.status, CandidateStatus::Impossible);
        assert_eq!(r.matched_len, 2);
        assert_eq!(r.ids, vec![103, 100, 101, 102]);
        assert_eq!(r.exact(), None);
    }

    #[test]
    fn test_candidates_skip_budget() {
        let trie = locality();
        let params = MatchParams {
            skip_min_local_count: 2,
            skip_max_in_walk: 1,
            ..Default::default()
        };
        // Two noise tokens in a row need a budget of 2.
        let r = find_candidates(&["KENT", "ASHFORD", "X", "Y", "MILL", "LANE", "3"], &trie, &params);
        assert_eq!(r.status, CandidateStatus::Impossible);
        assert_eq!(trace_tokens(&r), vec!["KENT", "ASHFORD"]);
    }

    #[test]
    fn test_candidates_entry_seed() {
        let trie = locality();
        let seq = ["ASHFORD", "MILL", "LANE", "2"];
        let params = MatchParams {
            entry_min_local_count: 4,
            ..Default::default()
        };
        let r = find_candidates(&seq, &trie, &params);
        assert_eq!(r.exact(), Some(101));
        assert_eq!(trace_tokens(&r), vec!["ASHFORD", "MILL", "LANE", "2"]);

        // Without KENT as a seed nothing matches from the root.
        let r = find_candidates(&seq, &trie, &MatchParams::default());
        assert_eq!(r.status, CandidateStatus::Ambiguous);
        assert_eq!(r.matched_len, 0);
        assert_eq!(r.ids, vec![103, 100, 101, 102, 104]);
        assert!(r.trace.is_empty());
    }

    #[test]
    fn test_candidates_min_matched_tokens() {
        let trie = locality();
        let params = MatchParams {
            min_matched_tokens: 3,
            ..Default::default()
        };
        let r = find_candidates(&["KENT", "WYE"], &trie, &params);
        assert_eq!(r.status, CandidateStatus::Impossible);
        assert_eq!(r.ids, vec![104]);
        assert!(r.consumed_all);
    }

    #[test]
    fn test_candidates_empty_input() {
        let trie = locality();
        let empty: [&str; 0] = [];
        let r = find_candidates(&empty, &trie, &MatchParams::default());
        assert_eq!(r.status, CandidateStatus::Ambiguous);
        assert!(r.ids.is_empty());
        assert_eq!(serde_json::to_value(&r).unwrap()["status"], "AMBIGUOUS");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(MatchStatus::Exact.as_str(), "EXACT");
        assert_eq!(MatchStatus::NoPath.as_str(), "NO_PATH");
        assert_eq!(serde_json::to_string(&MatchStatus::Insufficient).unwrap(), "\"INSUFFICIENT\"");
        assert_eq!(CandidateStatus::Impossible.as_str(), "IMPOSSIBLE");
    }
}
