//! Path arithmetic: extracting descent bits from an index hash, locating
//! the divergence point of two paths, and folding a leaf hash up through
//! empty siblings.

use crate::{
    bitmap::test_bit,
    constant::EMPTY_NODE_HASH,
    node::InternalNode,
    types::NodeHash,
};

/// Expands the first `num_levels - 1` bits of an index hash into the
/// descent path.
///
/// The returned vector is ordered leaf-to-root: entry 0 holds bit
/// `num_levels - 2` of `hi`, the last entry holds bit 0. Descent code
/// indexes it from the back (`path[num_levels - 2]` at the root), which
/// walks the bits of `hi` from the low end downward.
pub(crate) fn index_path(num_levels: usize, hi: &NodeHash) -> Vec<bool> {
    (0..=num_levels - 2)
        .rev()
        .map(|bit| test_bit(hi.as_slice(), bit))
        .collect()
}

/// The highest index at which two equal-length paths differ, or `None`
/// when they are identical. This index is the level where a split between
/// the two leaves must be placed.
pub(crate) fn compare_paths(a: &[bool], b: &[bool]) -> Option<usize> {
    debug_assert_eq!(a.len(), b.len());
    (0..a.len()).rev().find(|&i| a[i] != b[i])
}

/// Folds a leaf hash upward through `until_level` empty siblings.
///
/// Starting from `leaf_hash`, each step pairs the running digest with the
/// empty digest on the side opposite to `path[i]`. The result is the hash
/// of a subtree containing that single leaf, and the storage key of the
/// final node parking it at `until_level`.
pub(crate) fn fold_with_empty_siblings(
    until_level: usize,
    path: &[bool],
    leaf_hash: NodeHash,
) -> NodeHash {
    let mut current = leaf_hash;
    for &bit in &path[..until_level] {
        let node = if bit {
            InternalNode::new(EMPTY_NODE_HASH, current)
        } else {
            InternalNode::new(current, EMPTY_NODE_HASH)
        };
        current = node.hash();
    }
    current
}
