//! In-memory storage backend.
//!
//! [`MemStore`] is a [`KeyValueStore`] over a [`BTreeMap`] guarded by an
//! [`RwLock`]. It holds no tree logic at all; it exists for unit tests,
//! development, and as the reference implementation of the storage trait.
//! Production deployments should supply a database-backed store instead.

use crate::{traits::KeyValueStore, types::NodeHash};
use std::{collections::BTreeMap, sync::RwLock};

/// Thread-safe in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: RwLock<BTreeMap<NodeHash, Vec<u8>>>,
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read().expect("store lock poisoned").clone()),
        }
    }
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl KeyValueStore for MemStore {
    type Error = &'static str;

    fn put(&self, key: NodeHash, value: &[u8]) -> Result<(), Self::Error> {
        self.entries.write().unwrap().insert(key, value.to_vec());
        Ok(())
    }

    fn get(&self, key: NodeHash) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.entries.read().unwrap().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;

    #[test]
    fn put_get_round_trip() {
        let store = MemStore::new();
        let key = hash_bytes(b"key");
        assert_eq!(store.get(key).unwrap(), None);

        store.put(key, b"value").unwrap();
        assert_eq!(store.get(key).unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overwrite_replaces_the_entry() {
        let store = MemStore::new();
        let key = hash_bytes(b"key");
        store.put(key, b"first").unwrap();
        store.put(key, b"second").unwrap();
        assert_eq!(store.get(key).unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len(), 1);
    }

    /// Cloning snapshots the contents; later writes do not leak between
    /// the copies.
    #[test]
    fn clone_is_independent() {
        let store = MemStore::new();
        store.put(hash_bytes(b"a"), b"1").unwrap();

        let snapshot = store.clone();
        store.put(hash_bytes(b"b"), b"2").unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
