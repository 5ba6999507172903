//! The hash primitive binding nodes to their storage keys.
//!
//! Everything in the tree hashes through Keccak-256: leaf contents, index
//! prefixes, and the 64-byte bodies of internal nodes. The digests pinned
//! by the tests below are part of the wire contract; proofs exchanged
//! between processes only verify if both sides agree on them.

use crate::types::NodeHash;
use alloy_primitives::keccak256;

/// Computes the Keccak-256 digest of `bytes`.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> NodeHash {
    keccak256(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    /// Ensures hash outputs are stable across code changes. These values
    /// must never change: roots and proofs produced by older trees would
    /// stop verifying.
    #[test]
    fn hash_stability() {
        assert_eq!(
            hash_bytes(b"test"),
            b256!("9c22ff5f21f0b81b113e63f7db6da94fedef11b2119b4088b89664fb9a3cb658")
        );
        assert_eq!(
            hash_bytes(b"authorizeksign"),
            b256!("353f867ef725411de05e3d4b0a01c37cf7ad24bcc213141a05ed7726d7932a1f")
        );
    }

    /// The empty digest must not be producible by hashing; the tree relies
    /// on it never colliding with a real node.
    #[test]
    fn empty_input_does_not_hash_to_zero() {
        assert_ne!(hash_bytes(b""), crate::constant::EMPTY_NODE_HASH);
    }
}
