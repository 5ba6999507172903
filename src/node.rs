//! Node kinds, the internal-node body, and the stored record layout.
//!
//! Every store entry is a [`Record`]: a one-byte kind tag, the index
//! length as a little-endian `u32` (zero for internal and root records),
//! and the body. The key the record lives under is always the Keccak-256
//! hash of the node it encodes, so records are immutable and rewriting one
//! is a no-op by construction.

use crate::{
    constant::EMPTY_NODE_HASH,
    hasher::hash_bytes,
    types::NodeHash,
};
use serde::{Deserialize, Serialize};

/// Length of the record header: `tag(1) ‖ index_len(4)`.
pub const RECORD_HEADER_LEN: usize = 5;

/// Discriminates the stored node kinds.
///
/// `Empty` is never written to the store; the store adapter synthesizes it
/// for the reserved all-zero key so descent code can treat an empty
/// subtree like any other fetched node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    /// The empty subtree, signaled in-band by the all-zero digest.
    Empty = 0,
    /// An internal node carrying two child digests.
    Internal = 1,
    /// A solitary leaf parked at the level where its subtree becomes
    /// singleton. Shares its body with the leaf's value record but is
    /// stored under the folded subtree hash, not the content hash.
    Final = 2,
    /// The canonical copy of a leaf's raw bytes, keyed by content hash.
    Value = 3,
    /// The root record: a 32-byte pointer to the current root digest.
    Root = 4,
}

impl NodeKind {
    /// The on-disk tag byte.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Parses a tag byte. `None` for tags this engine never writes.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Empty),
            1 => Some(Self::Internal),
            2 => Some(Self::Final),
            3 => Some(Self::Value),
            4 => Some(Self::Root),
            _ => None,
        }
    }
}

/// An internal node: the pair of child digests whose concatenation hashes
/// to the node's storage key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternalNode {
    /// Digest of the left child, taken when the path bit is 0.
    pub left: NodeHash,
    /// Digest of the right child, taken when the path bit is 1.
    pub right: NodeHash,
}

impl InternalNode {
    /// Length of the serialized body, two digests.
    pub const BODY_LEN: usize = 64;

    /// Creates the node from its children.
    pub const fn new(left: NodeHash, right: NodeHash) -> Self {
        Self { left, right }
    }

    /// The 64-byte body, `left ‖ right`.
    pub fn bytes(&self) -> [u8; Self::BODY_LEN] {
        let mut body = [0u8; Self::BODY_LEN];
        body[..32].copy_from_slice(self.left.as_slice());
        body[32..].copy_from_slice(self.right.as_slice());
        body
    }

    /// The node hash `H(left ‖ right)`, which is also its storage key.
    pub fn hash(&self) -> NodeHash {
        hash_bytes(&self.bytes())
    }
}

impl TryFrom<&[u8]> for InternalNode {
    type Error = &'static str;

    fn try_from(body: &[u8]) -> Result<Self, Self::Error> {
        if body.len() != Self::BODY_LEN {
            return Err("internal node body must be 64 bytes");
        }
        Ok(Self {
            left: NodeHash::from_slice(&body[..32]),
            right: NodeHash::from_slice(&body[32..]),
        })
    }
}

/// A decoded store entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Node kind from the tag byte.
    pub kind: NodeKind,
    /// Index length of the encoded leaf; zero for non-leaf records.
    pub index_len: u32,
    /// The node body following the header.
    pub body: Vec<u8>,
}

impl Record {
    /// The in-band record for the reserved empty digest, mirroring what a
    /// store lookup would shape like without performing one.
    pub fn empty() -> Self {
        Self {
            kind: NodeKind::Empty,
            index_len: 0,
            body: EMPTY_NODE_HASH.to_vec(),
        }
    }

    /// The index prefix of a leaf body, or `None` when the recorded
    /// `index_len` overruns the body (a corrupt record).
    pub fn index(&self) -> Option<&[u8]> {
        self.body.get(..self.index_len as usize)
    }

    /// Serializes the record to its stored form.
    pub fn encode(&self) -> Vec<u8> {
        encode_record(self.kind, self.index_len, &self.body)
    }
}

/// Serializes a record without materializing a [`Record`] first.
pub fn encode_record(kind: NodeKind, index_len: u32, body: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(RECORD_HEADER_LEN + body.len());
    value.push(kind.tag());
    value.extend_from_slice(&index_len.to_le_bytes());
    value.extend_from_slice(body);
    value
}

impl TryFrom<&[u8]> for Record {
    type Error = &'static str;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < RECORD_HEADER_LEN {
            return Err("record shorter than its header");
        }
        let kind = NodeKind::from_tag(value[0]).ok_or("unknown node tag")?;
        let index_len = u32::from_le_bytes(value[1..5].try_into().expect("4-byte slice"));
        Ok(Self {
            kind,
            index_len,
            body: value[RECORD_HEADER_LEN..].to_vec(),
        })
    }
}
