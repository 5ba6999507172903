//! Constants that fix the shape and the reserved values of the tree.

use crate::{hasher::hash_bytes, types::NodeHash};
use alloy_primitives::B256;
use once_cell::sync::Lazy;

/// The reserved all-zero digest.
///
/// It denotes the empty subtree during descent, the "no value here" answer
/// of a lookup, and the in-band empty record returned by the store adapter.
/// No node is ever stored under this key; the tree detects emptiness by
/// comparing against it.
pub const EMPTY_NODE_HASH: NodeHash = B256::ZERO;

/// Smallest legal tree depth. A two-level tree has a single path bit.
pub const MIN_LEVELS: usize = 2;

/// Largest legal tree depth. Bounded by the 32-byte bitmaps: a tree of
/// depth `L` consumes path bits `0..L-1`, and proofs mark levels in a
/// 256-bit field.
pub const MAX_LEVELS: usize = 256;

/// Storage key of the root record, `keccak256("root")`.
///
/// The root record is the only store entry that is not content-addressed;
/// it holds the 32-byte digest of the current root and is rewritten after
/// every successful insertion.
pub static ROOT_RECORD_KEY: Lazy<NodeHash> = Lazy::new(|| hash_bytes(b"root"));
