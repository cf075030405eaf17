//! Group-scoped token trie.
//!
//! Nodes live in one flat arena and reference their children by index.
//! Every node counts the sequences that passed through it; a node where
//! sequences ended also counts those terminations and remembers the
//! identifier of the last row that ended there.

use crate::error::{Result, TrieError};

/// Opaque 64-bit record key (e.g. a property reference number).
pub type Identifier = u64;

/// Index of a node inside a [`Trie`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    pub(crate) count: u32,
    pub(crate) terminal_count: u32,
    pub(crate) representative_id: Identifier,
    /// Arrival rank of the row that set `representative_id`. Not serialized.
    pub(crate) rank: u64,
    /// Sorted by token bytes.
    pub(crate) children: Vec<(String, NodeId)>,
}

impl TrieNode {
    /// Sequences that passed through (or ended at) this node.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Sequences that ended exactly here.
    pub fn terminal_count(&self) -> u32 {
        self.terminal_count
    }

    /// Raw stored identifier; meaningless unless the node is terminal.
    pub fn representative_id(&self) -> Identifier {
        self.representative_id
    }

    pub fn representative(&self) -> Option<Identifier> {
        (self.terminal_count > 0).then_some(self.representative_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_count > 0
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Children in ascending token order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(tok, id)| (tok.as_str(), *id))
    }

    fn find(&self, token: &str) -> std::result::Result<usize, usize> {
        self.children.binary_search_by(|(k, _)| k.as_str().cmp(token))
    }
}

/// Immutable-after-build token trie for one group.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    /// A trie holding no sequences: a bare root.
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Build from `(identifier, tokens)` rows in arrival order.
    pub fn build<I, S, T>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Identifier, S)>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut builder = TrieBuilder::new();
        for (id, tokens) in rows {
            builder.insert(id, tokens);
        }
        builder.finish()
    }

    /// Build from token sequences alone; every terminal carries identifier 0.
    pub fn build_unlabelled<I, S, T>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::build(sequences.into_iter().map(|s| (0, s)))
    }

    pub(crate) fn from_nodes(nodes: Vec<TrieNode>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    pub fn root(&self) -> &TrieNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.0]
    }

    /// Number of sequences inserted.
    pub fn total(&self) -> u32 {
        self.root().count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no sequence was ever inserted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn child(&self, id: NodeId, token: &str) -> Option<NodeId> {
        let node = self.node(id);
        node.find(token).ok().map(|i| node.children[i].1)
    }

    /// Follow `tokens` from the root; `None` once any token is missing.
    pub fn walk<T: AsRef<str>>(&self, tokens: &[T]) -> Option<NodeId> {
        self.walk_from(NodeId::ROOT, tokens)
    }

    pub fn walk_from<T: AsRef<str>>(&self, start: NodeId, tokens: &[T]) -> Option<NodeId> {
        tokens
            .iter()
            .try_fold(start, |id, tok| self.child(id, tok.as_ref()))
    }

    /// Nodes reached by consuming as many of `tokens` as the trie allows,
    /// one entry per consumed token.
    pub fn walk_longest<T: AsRef<str>>(&self, start: NodeId, tokens: &[T]) -> Vec<NodeId> {
        let mut path = Vec::with_capacity(tokens.len());
        let mut current = start;
        for tok in tokens {
            match self.child(current, tok.as_ref()) {
                Some(next) => {
                    path.push(next);
                    current = next;
                }
                None => break,
            }
        }
        path
    }

    /// Count at the node `tokens` lead to from the root, 0 if the path breaks.
    pub fn count_path<T: AsRef<str>>(&self, tokens: &[T]) -> u32 {
        self.walk(tokens).map_or(0, |id| self.node(id).count)
    }

    /// Representatives of terminal nodes at or below `id`, depth-first in
    /// ascending token order, at most `limit` of them.
    pub fn terminals_under(&self, id: NodeId, limit: usize) -> Vec<Identifier> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if out.len() >= limit {
                break;
            }
            let node = self.node(current);
            if let Some(rep) = node.representative() {
                out.push(rep);
            }
            stack.extend(node.children.iter().rev().map(|(_, child)| *child));
        }
        out
    }

    /// Fold `other` (same group) into `self`: counts add up (saturating), children are
    /// unioned, and a terminal keeps the representative with the later
    /// arrival rank (ties broken by the larger identifier).
    pub fn merge(&mut self, other: &Trie) {
        let mut stack = vec![(NodeId::ROOT, NodeId::ROOT)];
        while let Some((dst, src)) = stack.pop() {
            let src_node = other.node(src);
            {
                let d = &mut self.nodes[dst.0];
                d.count = d.count.saturating_add(src_node.count);
                if src_node.terminal_count > 0 {
                    let incoming = (src_node.rank, src_node.representative_id);
                    if d.terminal_count == 0 || incoming > (d.rank, d.representative_id) {
                        d.rank = src_node.rank;
                        d.representative_id = src_node.representative_id;
                    }
                    d.terminal_count = d.terminal_count.saturating_add(src_node.terminal_count);
                }
            }
            for (tok, src_child) in &src_node.children {
                let dst_child = self.child_or_insert(dst, tok);
                stack.push((dst_child, *src_child));
            }
        }
    }

    /// Check the count and key invariants on every node.
    pub fn validate(&self) -> Result<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            if node.terminal_count > node.count {
                return Err(TrieError::Invariant {
                    node: i,
                    reason: format!("terminal count {} exceeds count {}", node.terminal_count, node.count),
                });
            }
            let below: u64 = node
                .children
                .iter()
                .map(|(_, c)| u64::from(self.nodes[c.0].count))
                .sum();
            if u64::from(node.count) != u64::from(node.terminal_count) + below {
                return Err(TrieError::Invariant {
                    node: i,
                    reason: format!(
                        "count {} != terminal {} + children {}",
                        node.count, node.terminal_count, below
                    ),
                });
            }
            if let Some(w) = node.children.windows(2).find(|w| w[0].0 >= w[1].0) {
                return Err(TrieError::Invariant {
                    node: i,
                    reason: format!("children out of order or duplicated at {:?}", w[1].0),
                });
            }
        }
        Ok(())
    }

    fn child_or_insert(&mut self, parent: NodeId, token: &str) -> NodeId {
        match self.nodes[parent.0].find(token) {
            Ok(i) => self.nodes[parent.0].children[i].1,
            Err(pos) => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(TrieNode::default());
                self.nodes[parent.0].children.insert(pos, (token.to_string(), id));
                id
            }
        }
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: arena layout and arrival ranks are ignored.
impl PartialEq for Trie {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(NodeId::ROOT, NodeId::ROOT)];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (self.node(a), other.node(b));
            if na.count != nb.count
                || na.terminal_count != nb.terminal_count
                || na.representative_id != nb.representative_id
                || na.children.len() != nb.children.len()
            {
                return false;
            }
            for ((ta, ca), (tb, cb)) in na.children.iter().zip(&nb.children) {
                if ta != tb {
                    return false;
                }
                stack.push((*ca, *cb));
            }
        }
        true
    }
}

impl Eq for Trie {}

/// Streaming construction: rows are inserted in arrival order.
#[derive(Debug, Clone)]
pub struct TrieBuilder {
    trie: Trie,
    next_rank: u64,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::with_rank_offset(0)
    }

    /// Start arrival ranks at `offset`, so partial tries built from
    /// consecutive shards merge into the same result as one sequential build.
    pub fn with_rank_offset(offset: u64) -> Self {
        Self {
            trie: Trie::new(),
            next_rank: offset,
        }
    }

    /// Insert one row. An empty sequence terminates at the root.
    pub fn insert<S, T>(&mut self, id: Identifier, tokens: S)
    where
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let rank = self.next_rank;
        self.next_rank += 1;

        let mut current = NodeId::ROOT;
        self.trie.nodes[0].count += 1;
        for tok in tokens {
            current = self.trie.child_or_insert(current, tok.as_ref());
            self.trie.nodes[current.0].count += 1;
        }
        let node = &mut self.trie.nodes[current.0];
        node.terminal_count += 1;
        node.representative_id = id;
        node.rank = rank;
    }

    pub fn rows(&self) -> u32 {
        self.trie.total()
    }

    pub fn finish(self) -> Trie {
        self.trie
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}
