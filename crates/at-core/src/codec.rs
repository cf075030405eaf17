//! QCK2 binary format for [`Trie`].
//!
//! ```text
//! magic   "QCK2"
//! flags   u8 (0)
//! node    u32 count, u32 terminal_count, u64 representative_id, u32 child_count,
//!         then per child: u32 token_len, token bytes (UTF-8), node
//! ```
//!
//! All integers little-endian, nodes in depth-first pre-order, children in
//! ascending token order, nothing after the root node.

use crate::error::{FormatError, Result};
use crate::trie::{NodeId, Trie, TrieNode};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{self, Write};
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"QCK2";
pub const FLAGS: u8 = 0;

const HEADER_LEN: usize = 5;
const NODE_HEADER_LEN: usize = 4 + 4 + 8 + 4;
/// Smallest possible encoding of one child: empty token + leaf node.
const MIN_CHILD_LEN: usize = 4 + NODE_HEADER_LEN;

enum Item<'a> {
    Node(NodeId),
    Token(&'a str),
}

/// Serialize a trie. Deterministic: equal tries give equal bytes.
pub fn encode(trie: &Trie) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + trie.node_count() * (NODE_HEADER_LEN + 12));
    // Writes into a Vec cannot fail.
    let _ = write_to(trie, &mut buf);
    buf
}

/// Stream the QCK2 encoding of `trie` into `w`.
pub fn write_to<W: Write>(trie: &Trie, w: &mut W) -> io::Result<()> {
    w.write_all(MAGIC)?;
    w.write_u8(FLAGS)?;

    let mut stack = vec![Item::Node(NodeId::ROOT)];
    while let Some(item) = stack.pop() {
        match item {
            Item::Token(tok) => {
                w.write_u32::<LittleEndian>(tok.len() as u32)?;
                w.write_all(tok.as_bytes())?;
            }
            Item::Node(id) => {
                let node = trie.node(id);
                w.write_u32::<LittleEndian>(node.count())?;
                w.write_u32::<LittleEndian>(node.terminal_count())?;
                w.write_u64::<LittleEndian>(node.representative_id())?;
                w.write_u32::<LittleEndian>(node.child_count() as u32)?;
                for (tok, child) in node.children.iter().rev() {
                    stack.push(Item::Node(*child));
                    stack.push(Item::Token(tok));
                }
            }
        }
    }
    Ok(())
}

/// Parse a QCK2 blob. Magic and flags are checked before any node is read;
/// nothing is returned unless the whole buffer is a well-formed trie.
pub fn decode(bytes: &[u8]) -> std::result::Result<Trie, FormatError> {
    decode_inner(bytes).inspect_err(|e| debug!(len = bytes.len(), error = %e, "rejected trie blob"))
}

fn decode_inner(bytes: &[u8]) -> std::result::Result<Trie, FormatError> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(FormatError::BadMagic {
            found: bytes[..bytes.len().min(MAGIC.len())].to_vec(),
        });
    }
    let mut r = Reader { data: bytes, pos: MAGIC.len() };
    let flags = r.u8("flags")?;
    if flags != FLAGS {
        return Err(FormatError::UnsupportedFlags(flags));
    }

    let (root, root_children) = r.node()?;
    let mut nodes = vec![root];
    // (node, children still to read)
    let mut stack = vec![(0usize, root_children)];

    while let Some(top) = stack.last_mut() {
        if top.1 == 0 {
            stack.pop();
            continue;
        }
        top.1 -= 1;
        let parent = top.0;

        let token_offset = r.pos;
        let token = r.token()?;
        let (node, child_count) = r.node()?;
        let id = NodeId::from_index(nodes.len());
        nodes.push(node);
        attach(&mut nodes[parent].children, token, id, token_offset)?;
        stack.push((id.index(), child_count));
    }

    if r.remaining() > 0 {
        return Err(FormatError::TrailingBytes { count: r.remaining() });
    }
    Ok(Trie::from_nodes(nodes))
}

/// Keep siblings sorted even if the writer did not.
fn attach(
    children: &mut Vec<(String, NodeId)>,
    token: String,
    id: NodeId,
    offset: usize,
) -> std::result::Result<(), FormatError> {
    match children.last() {
        Some((last, _)) if *last >= token => {
            match children.binary_search_by(|(k, _)| k.as_str().cmp(&token)) {
                Ok(_) => return Err(FormatError::DuplicateToken { token, offset }),
                Err(pos) => children.insert(pos, (token, id)),
            }
        }
        _ => children.push((token, id)),
    }
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> std::result::Result<&'a [u8], FormatError> {
        if n > self.remaining() {
            return Err(FormatError::Truncated {
                what,
                offset: self.pos,
                need: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> std::result::Result<u8, FormatError> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &'static str) -> std::result::Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(self.take(4, what)?))
    }

    fn u64(&mut self, what: &'static str) -> std::result::Result<u64, FormatError> {
        Ok(LittleEndian::read_u64(self.take(8, what)?))
    }

    fn token(&mut self) -> std::result::Result<String, FormatError> {
        let len = self.u32("token length")? as usize;
        let offset = self.pos;
        let raw = self.take(len, "token bytes")?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| FormatError::InvalidToken { offset })
    }

    fn node(&mut self) -> std::result::Result<(TrieNode, u32), FormatError> {
        let count = self.u32("node count")?;
        let terminal_count = self.u32("terminal count")?;
        let representative_id = self.u64("representative id")?;
        let child_count = self.u32("child count")?;

        let need = (child_count as usize).saturating_mul(MIN_CHILD_LEN);
        if need > self.remaining() {
            return Err(FormatError::Truncated {
                what: "children",
                offset: self.pos,
                need,
                remaining: self.remaining(),
            });
        }

        let node = TrieNode {
            count,
            terminal_count,
            representative_id,
            rank: 0,
            children: Vec::with_capacity(child_count as usize),
        };
        Ok((node, child_count))
    }
}

impl Trie {
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(decode(bytes)?)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        Ok(write_to(self, w)?)
    }
}
