//! Proof encoding and the stateless verifier.
//!
//! A proof is `empties(32) ‖ sibling_1(32) ‖ … ‖ sibling_k(32)`: a bitmap
//! marking which levels carry a non-empty sibling, followed by exactly
//! those siblings, ordered from the deepest occupied level to the
//! shallowest. Empty siblings never appear on the wire; the verifier
//! resynthesizes them from the bitmap. Verification recomputes the root
//! from the claimed leaf hash without any store access.

use crate::{
    bitmap::{count_ones, test_bit},
    constant::{EMPTY_NODE_HASH, MAX_LEVELS, MIN_LEVELS},
    node::InternalNode,
    tree::path::index_path,
    types::NodeHash,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the empties bitmap prefix.
pub const EMPTIES_LEN: usize = 32;

/// Reasons a byte string is not a proof.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofDecodeError {
    /// The length is not `32 + 32k`.
    #[error("proof length {0} is not 32 + 32k")]
    Length(usize),

    /// The bitmap population does not match the encoded sibling count.
    #[error("bitmap marks {marked} siblings but {present} are encoded")]
    SiblingCount {
        /// Bits set in the empties bitmap.
        marked: usize,
        /// Siblings actually encoded.
        present: usize,
    },
}

/// A decoded Merkle proof for a single position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Bitmap of levels carrying a non-empty sibling; bit 0, kept in the
    /// last byte, marks the level just under the root.
    empties: [u8; EMPTIES_LEN],
    /// The non-empty siblings, deepest first.
    siblings: Vec<NodeHash>,
}

impl Proof {
    pub(crate) fn new(empties: [u8; EMPTIES_LEN], siblings: Vec<NodeHash>) -> Self {
        Self { empties, siblings }
    }

    /// The empties bitmap.
    pub fn empties(&self) -> &[u8; EMPTIES_LEN] {
        &self.empties
    }

    /// The non-empty siblings, deepest first.
    pub fn siblings(&self) -> &[NodeHash] {
        &self.siblings
    }

    /// Serializes to the wire encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EMPTIES_LEN + 32 * self.siblings.len());
        out.extend_from_slice(&self.empties);
        for sibling in &self.siblings {
            out.extend_from_slice(sibling.as_slice());
        }
        out
    }

    /// Parses the wire encoding, rejecting truncated payloads and bitmaps
    /// that disagree with the sibling count.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofDecodeError> {
        if bytes.len() < EMPTIES_LEN || (bytes.len() - EMPTIES_LEN) % 32 != 0 {
            return Err(ProofDecodeError::Length(bytes.len()));
        }
        let empties: [u8; EMPTIES_LEN] = bytes[..EMPTIES_LEN].try_into().expect("32-byte slice");
        let siblings: Vec<NodeHash> = bytes[EMPTIES_LEN..]
            .chunks_exact(32)
            .map(NodeHash::from_slice)
            .collect();
        let marked = count_ones(&empties);
        if marked != siblings.len() {
            return Err(ProofDecodeError::SiblingCount {
                marked,
                present: siblings.len(),
            });
        }
        Ok(Self { empties, siblings })
    }

    /// Verifies this proof against `root` for the position of `hi`
    /// holding leaf hash `ht`.
    ///
    /// Pass the empty digest as `ht` to verify non-membership. Returns a
    /// plain boolean: an invalid proof and a malformed one are
    /// indistinguishable by design, and this never touches storage.
    pub fn verify(&self, root: &NodeHash, hi: &NodeHash, ht: &NodeHash, num_levels: usize) -> bool {
        if !(MIN_LEVELS..=MAX_LEVELS).contains(&num_levels) {
            return false;
        }
        let path = index_path(num_levels, hi);

        let mut node_hash = *ht;
        let mut used = 0;
        for level in (0..=num_levels - 2).rev() {
            let sibling = if test_bit(&self.empties, level) {
                match self.siblings.get(used) {
                    Some(sibling) => {
                        used += 1;
                        *sibling
                    }
                    None => return false,
                }
            } else {
                EMPTY_NODE_HASH
            };

            // Two empty children collapse to the empty parent, never to
            // H(0 ‖ 0); this is what keeps unoccupied subtrees at the
            // reserved digest all the way up.
            node_hash = if node_hash == EMPTY_NODE_HASH && sibling == EMPTY_NODE_HASH {
                EMPTY_NODE_HASH
            } else if path[num_levels - level - 2] {
                InternalNode::new(sibling, node_hash).hash()
            } else {
                InternalNode::new(node_hash, sibling).hash()
            };
        }
        node_hash == *root
    }
}

/// Verifies a proof straight from its wire encoding.
///
/// Malformed encodings verify as `false`; see [`Proof::verify`] for the
/// semantics of the remaining arguments.
pub fn check_proof(
    root: &NodeHash,
    proof: &[u8],
    hi: &NodeHash,
    ht: &NodeHash,
    num_levels: usize,
) -> bool {
    match Proof::from_bytes(proof) {
        Ok(proof) => proof.verify(root, hi, ht, num_levels),
        Err(_) => false,
    }
}
