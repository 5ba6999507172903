//! The storage trait the tree engine is generic over.

use crate::types::NodeHash;
use std::fmt::Debug;

/// A byte store addressed by 32-byte keys.
///
/// This is the whole of what the tree requires from its backing storage.
/// Writes are content-addressed except for the single root record, so a
/// backend may deduplicate or skip overwrites of existing keys freely.
/// The tree publishes a new root only after all node writes have been
/// acknowledged; a backend that buffers writes must preserve that order
/// for readers to observe consistent subtrees.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Backend error type.
    type Error: Debug + Send;

    /// Stores `value` under `key`, overwriting any previous entry.
    fn put(&self, key: NodeHash, value: &[u8]) -> Result<(), Self::Error>;

    /// Retrieves the entry under `key`, or `None` when absent.
    fn get(&self, key: NodeHash) -> Result<Option<Vec<u8>>, Self::Error>;
}
