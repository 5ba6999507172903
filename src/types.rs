//! Core types: the digest alias and the leaf capability.

use crate::hasher::hash_bytes;
use alloy_primitives::B256;
use derive_more::Deref;
use serde::{Deserialize, Serialize};

/// A 32-byte Keccak-256 digest. Doubles as the storage key of the node it
/// identifies.
pub type NodeHash = B256;

/// A leaf as the tree consumes it: an opaque byte payload whose leading
/// `index_len` bytes form the *index*, the part that decides the leaf's
/// position.
///
/// Two leaves with the same index occupy the same position and the second
/// insertion is rejected, however much the remaining bytes differ. The
/// remaining bytes still contribute to the content hash, so they are fully
/// committed by the root.
pub trait Leaf {
    /// The complete serialized leaf.
    fn bytes(&self) -> &[u8];

    /// Number of leading bytes forming the index. Must not exceed
    /// `bytes().len()`; [`MerkleTree::add`](crate::MerkleTree::add) rejects
    /// leaves violating this.
    fn index_len(&self) -> u32;

    /// Content hash `H(bytes)`: the digest the leaf's value record is
    /// stored under, and the `ht` argument of a membership proof.
    fn content_hash(&self) -> NodeHash {
        hash_bytes(self.bytes())
    }

    /// Index hash `H(bytes[..index_len])`: the digest whose bit expansion
    /// is the leaf's path from the root.
    ///
    /// # Panics
    ///
    /// Panics if `index_len() > bytes().len()`.
    fn index_hash(&self) -> NodeHash {
        hash_bytes(&self.bytes()[..self.index_len() as usize])
    }
}

/// The simplest [`Leaf`]: a byte vector plus an index length.
#[derive(Clone, Debug, Deref, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLeaf {
    /// The serialized leaf contents.
    #[deref]
    data: Vec<u8>,
    /// Length of the index prefix within `data`.
    index_len: u32,
}

impl RawLeaf {
    /// Creates a leaf from its serialized contents and index length. The
    /// index length is not validated here; an oversized one is rejected at
    /// insertion time.
    pub fn new(data: impl Into<Vec<u8>>, index_len: u32) -> Self {
        Self {
            data: data.into(),
            index_len,
        }
    }
}

impl Leaf for RawLeaf {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn index_len(&self) -> u32 {
        self.index_len
    }
}
