#![doc = include_str!("../README.md")]

pub mod bitmap;
pub mod constant;
pub mod hasher;
pub mod mem_store;
pub mod node;
pub mod proof;
pub mod traits;
pub mod tree;
pub mod types;

pub use constant::EMPTY_NODE_HASH;
pub use mem_store::MemStore;
pub use proof::{check_proof, Proof, ProofDecodeError};
pub use traits::KeyValueStore;
pub use tree::{MerkleTree, TreeError};
pub use types::{Leaf, NodeHash, RawLeaf};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;
    use alloy_primitives::b256;

    /// End-to-end walk over the whole public surface, pinning every root
    /// and proof to its known value: single leaf, split, membership and
    /// non-membership proofs, lookup, order independence, and a
    /// 1000-leaf tree.
    #[test]
    fn specification_vectors() {
        let store = MemStore::new();
        let mut tree = MerkleTree::new(&store, 140).unwrap();

        // Empty tree commits to the reserved digest.
        assert_eq!(tree.root(), EMPTY_NODE_HASH);

        // A short binary leaf with a 3-byte index.
        let store_n = MemStore::new();
        let mut tree_n = MerkleTree::new(&store_n, 140).unwrap();
        tree_n.add(&RawLeaf::new(vec![1u8, 2, 3, 4, 5], 3)).unwrap();
        assert_eq!(
            tree_n.root(),
            b256!("a0e72cc948119fcb71b413cf5ada12b2b825d5133299b20a6d9325ffc3e2fbf1")
        );

        // A single text leaf; its proof is an empty bitmap with no
        // siblings.
        let leaf = RawLeaf::new(&b"this is a test leaf"[..], 15);
        tree.add(&leaf).unwrap();
        assert_eq!(
            tree.root(),
            b256!("b4fdf8a653198f0e179ccb3af7e4fc09d76247f479d6cfc95cd92d6fda589f27")
        );
        let proof = tree.prove(&leaf.index_hash()).unwrap();
        assert_eq!(proof.to_bytes(), vec![0u8; 32]);

        // A second leaf splits the final node.
        let leaf2 = RawLeaf::new(&b"this is a second test leaf"[..], 15);
        tree.add(&leaf2).unwrap();
        assert_eq!(
            tree.root(),
            b256!("8ac95e9c8a6fbd40bb21de7895ee35f9c8f30ca029dbb0972c02344f49462e82")
        );
        let proof2 = tree.prove(&leaf2.index_hash()).unwrap();
        assert_eq!(
            hex::encode(proof2.to_bytes()),
            "0000000000000000000000000000000000000000000000000000000000000001\
             fd8e1a60cdb23c0c7b2cf8462c99fafd905054dccb0ed75e7c8a7d6806749b6b"
        );

        // Non-membership proof for a third, absent leaf.
        let leaf3 = RawLeaf::new(&b"this is a third test leaf"[..], 15);
        let proof3 = tree.prove(&leaf3.index_hash()).unwrap();
        assert_eq!(
            hex::encode(proof3.to_bytes()),
            "0000000000000000000000000000000000000000000000000000000000000003\
             89741fa23da77c259781ad8f4331a5a7d793eef1db7e5200ddfc8e5f5ca7ce2b\
             fd8e1a60cdb23c0c7b2cf8462c99fafd905054dccb0ed75e7c8a7d6806749b6b"
        );

        // Lookup round-trips the stored bytes.
        assert_eq!(
            tree.value_at(&leaf2.index_hash()).unwrap().as_deref(),
            Some(leaf2.bytes())
        );

        // The generated proofs verify against the live root; the absent
        // leaf verifies with the empty digest.
        assert!(proof2.verify(
            &tree.root(),
            &leaf2.index_hash(),
            &leaf2.content_hash(),
            tree.num_levels()
        ));
        assert!(check_proof(
            &tree.root(),
            &proof3.to_bytes(),
            &leaf3.index_hash(),
            &EMPTY_NODE_HASH,
            tree.num_levels()
        ));

        // Six leaves inserted in two different orders converge on the
        // same pinned root.
        let leaves: Vec<RawLeaf> = (0..6)
            .map(|i| RawLeaf::new(format!("{i} this is a test leaf").into_bytes(), 15))
            .collect();

        let store1 = MemStore::new();
        let mut tree1 = MerkleTree::new(&store1, 140).unwrap();
        for leaf in &leaves {
            tree1.add(leaf).unwrap();
        }

        let store2 = MemStore::new();
        let mut tree2 = MerkleTree::new(&store2, 140).unwrap();
        for i in [2usize, 1, 0, 5, 3, 4] {
            tree2.add(&leaves[i]).unwrap();
        }

        assert_eq!(tree1.root(), tree2.root());
        assert_eq!(
            tree1.root(),
            b256!("264397f84da141b3134dcde1d7540d27a2bf0d787bbe8365d9ad5c9c18d3c621")
        );

        // One thousand leaves, one pinned root.
        let store1000 = MemStore::new();
        let mut tree1000 = MerkleTree::new(&store1000, 140).unwrap();
        for i in 0..1000 {
            let leaf = RawLeaf::new(format!("{i} this is a test leaf").into_bytes(), 15);
            tree1000.add(&leaf).unwrap();
        }
        assert_eq!(
            tree1000.root(),
            b256!("6e2da580b2920cd78ed8d4e4bf41e209dfc99ef28bc19560042f0ac803e0d6f7")
        );
    }

    /// Every leaf of a populated tree proves membership, and a permuted
    /// probe set proves non-membership, against the same root.
    #[test]
    fn proofs_for_every_leaf() {
        let store = MemStore::new();
        let mut tree = MerkleTree::new(&store, 140).unwrap();

        let leaves: Vec<RawLeaf> = (0..40)
            .map(|i| RawLeaf::new(format!("{i} this is a test leaf").into_bytes(), 15))
            .collect();
        for leaf in &leaves {
            tree.add(leaf).unwrap();
        }

        for leaf in &leaves {
            let proof = tree.prove(&leaf.index_hash()).unwrap();
            assert!(proof.verify(
                &tree.root(),
                &leaf.index_hash(),
                &leaf.content_hash(),
                tree.num_levels()
            ));
        }

        for i in 40..60 {
            let absent = RawLeaf::new(format!("{i} this is a test leaf").into_bytes(), 15);
            let proof = tree.prove(&absent.index_hash()).unwrap();
            assert!(proof.verify(
                &tree.root(),
                &absent.index_hash(),
                &EMPTY_NODE_HASH,
                tree.num_levels()
            ));
            // The membership claim for the absent leaf must not verify.
            assert!(!proof.verify(
                &tree.root(),
                &absent.index_hash(),
                &absent.content_hash(),
                tree.num_levels()
            ));
        }
    }

    /// The placeholder hashes of the original specification suite.
    #[test]
    fn specification_hash_vectors() {
        assert_eq!(
            hash_bytes(b"test"),
            b256!("9c22ff5f21f0b81b113e63f7db6da94fedef11b2119b4088b89664fb9a3cb658")
        );
        assert_eq!(
            hash_bytes(b"authorizeksign"),
            b256!("353f867ef725411de05e3d4b0a01c37cf7ad24bcc213141a05ed7726d7932a1f")
        );
    }
}
