//! The tree engine: canonical insertion, lookup, and proof generation
//! over a [`KeyValueStore`](crate::traits::KeyValueStore).

pub(crate) mod path;
#[allow(clippy::module_inception)]
pub mod tree;

pub use tree::MerkleTree;

use crate::types::NodeHash;
use thiserror::Error;

/// Errors raised by the tree engine, generic over the backing store's
/// error type.
#[derive(Debug, Error)]
pub enum TreeError<E> {
    /// A leaf with the same index hash already occupies the position.
    /// The tree structure and the root are unchanged.
    #[error("node already exists")]
    AlreadyExists,

    /// A digest reachable from the root had no record in the store.
    #[error("node {0} not found in storage")]
    NotFound(NodeHash),

    /// A stored record could not be decoded, or carried a kind the engine
    /// never writes at that position.
    #[error("corrupt record under {0}: {1}")]
    Corrupt(NodeHash, &'static str),

    /// The leaf declared an index length larger than its payload.
    #[error("index length {index_len} exceeds leaf length {leaf_len}")]
    IndexOutOfBounds {
        /// Declared index length.
        index_len: u32,
        /// Actual payload length.
        leaf_len: usize,
    },

    /// The requested depth falls outside the supported `2..=256` range.
    #[error("number of levels must be within 2..=256, got {0}")]
    InvalidLevels(usize),

    /// The backing store failed.
    #[error("storage failure: {0:?}")]
    Store(E),
}
