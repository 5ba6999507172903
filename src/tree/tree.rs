//! This module implements [`MerkleTree`].

use crate::{
    constant::{EMPTY_NODE_HASH, MAX_LEVELS, MIN_LEVELS, ROOT_RECORD_KEY},
    hasher::hash_bytes,
    node::{encode_record, InternalNode, NodeKind, Record},
    proof::Proof,
    traits::KeyValueStore,
    tree::{
        path::{compare_paths, fold_with_empty_siblings, index_path},
        TreeError,
    },
    types::{Leaf, NodeHash},
};
use std::fmt::Write as _;
use tracing::{debug, trace};

/// A sparse binary Merkle tree with path-compressed leaves over a
/// key-value store.
///
/// The tree is canonical: the root depends only on the set of leaves,
/// never on their insertion order. A solitary leaf along a branch is
/// parked as a single *final node* at the first level where its subtree
/// becomes singleton and is pushed down only when a second leaf collides
/// with that subtree, so a tree of depth 140 over a handful of leaves
/// stores a handful of records.
///
/// The engine is single-writer: content-addressed node writes commute,
/// but the root record does not, and callers must serialize mutation.
/// Readers see a consistent subtree under whichever root they load,
/// because the root record is always written after the nodes it points
/// to.
#[derive(Debug)]
pub struct MerkleTree<'a, S: KeyValueStore> {
    /// Backing storage for node records and the root record.
    store: &'a S,
    /// Digest of the current root; the empty digest for an empty tree.
    root: NodeHash,
    /// Depth of the tree; paths consume `num_levels - 1` bits.
    num_levels: usize,
}

impl<'a, S: KeyValueStore> MerkleTree<'a, S> {
    /// Opens the tree stored in `store`, or initializes an empty one.
    ///
    /// A present root record is loaded and validated; an absent one is
    /// created pointing at the empty digest before this returns, so the
    /// store never holds a tree without a readable root record.
    ///
    /// `num_levels` fixes the depth for the lifetime of the stored tree;
    /// reopening an existing store with a different depth is undefined.
    pub fn new(store: &'a S, num_levels: usize) -> Result<Self, TreeError<S::Error>> {
        if !(MIN_LEVELS..=MAX_LEVELS).contains(&num_levels) {
            return Err(TreeError::InvalidLevels(num_levels));
        }
        let mut tree = Self {
            store,
            root: EMPTY_NODE_HASH,
            num_levels,
        };
        match store.get(*ROOT_RECORD_KEY).map_err(TreeError::Store)? {
            Some(bytes) => {
                let record = Record::try_from(bytes.as_slice())
                    .map_err(|reason| TreeError::Corrupt(*ROOT_RECORD_KEY, reason))?;
                if record.kind != NodeKind::Root || record.body.len() != 32 {
                    return Err(TreeError::Corrupt(*ROOT_RECORD_KEY, "malformed root record"));
                }
                tree.root = NodeHash::from_slice(&record.body);
            }
            None => tree.persist_root()?,
        }
        Ok(tree)
    }

    /// The current root digest. The empty digest for an empty tree.
    pub fn root(&self) -> NodeHash {
        self.root
    }

    /// The configured depth.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Inserts a leaf at the position derived from its index hash.
    ///
    /// The leaf's value record is written first (content-addressed, so
    /// repeating it is harmless), then the branch from the root to the
    /// leaf's position is restructured and rewritten, and the root record
    /// is updated last. If another leaf with the same index hash is
    /// already present the insertion fails with
    /// [`TreeError::AlreadyExists`] and the tree is structurally
    /// unchanged.
    pub fn add<L: Leaf + ?Sized>(&mut self, leaf: &L) -> Result<(), TreeError<S::Error>> {
        let bytes = leaf.bytes();
        let index_len = leaf.index_len();
        if index_len as usize > bytes.len() {
            return Err(TreeError::IndexOutOfBounds {
                index_len,
                leaf_len: bytes.len(),
            });
        }

        let content_hash = hash_bytes(bytes);
        self.put_record(content_hash, NodeKind::Value, index_len, bytes)?;

        let hi = hash_bytes(&bytes[..index_len as usize]);
        let path = index_path(self.num_levels, &hi);

        let mut node_hash = self.root;
        let mut siblings: Vec<NodeHash> = Vec::new();
        for i in (0..=self.num_levels - 2).rev() {
            let record = self.get_record(node_hash)?;
            if record.kind == NodeKind::Final {
                return self.split_final(record, node_hash, &path, i, content_hash, index_len, bytes, siblings);
            }

            let node = self.internal_children(&record, node_hash)?;
            let sibling;
            if !path[i] {
                node_hash = node.left;
                sibling = node.right;
            } else {
                node_hash = node.right;
                sibling = node.left;
            }
            siblings.push(sibling);

            if node_hash == EMPTY_NODE_HASH {
                // The branch is unoccupied from here down; park the leaf
                // as a final node instead of materializing empty levels.
                if i == self.num_levels - 2 && sibling == EMPTY_NODE_HASH {
                    // Empty tree: the folded final node is the root itself.
                    let final_hash = fold_with_empty_siblings(i + 1, &path, content_hash);
                    self.put_record(final_hash, NodeKind::Final, index_len, bytes)?;
                    self.root = final_hash;
                    return self.persist_root();
                }
                let final_hash = fold_with_empty_siblings(i, &path, content_hash);
                self.root =
                    self.replace_leaf(&siblings, &path[i..], final_hash, NodeKind::Final, index_len, bytes)?;
                return self.persist_root();
            }
        }

        // The descent used up every internal level: the leaf lives at full
        // depth and its value record doubles as the leaf node.
        self.root = self.replace_leaf(&siblings, &path, content_hash, NodeKind::Value, index_len, bytes)?;
        self.persist_root()
    }

    /// Returns the leaf bytes stored at the position of `hi`, or `None`
    /// when the position is unoccupied.
    pub fn value_at(&self, hi: &NodeHash) -> Result<Option<Vec<u8>>, TreeError<S::Error>> {
        let path = index_path(self.num_levels, hi);
        let mut node_hash = self.root;
        for i in (0..=self.num_levels - 2).rev() {
            let record = self.get_record(node_hash)?;
            if record.kind == NodeKind::Final {
                // A final node answers for its whole subtree: the queried
                // position holds its leaf exactly when the paths agree.
                let incumbent_hi = hash_bytes(leaf_index(&record, node_hash)?);
                let incumbent_path = index_path(self.num_levels, &incumbent_hi);
                return Ok(match compare_paths(&path, &incumbent_path) {
                    None => Some(record.body),
                    Some(_) => None,
                });
            }
            let node = self.internal_children(&record, node_hash)?;
            node_hash = if !path[i] { node.left } else { node.right };
        }
        let record = self.get_record(node_hash)?;
        Ok(match record.kind {
            NodeKind::Empty => None,
            _ => Some(record.body),
        })
    }

    /// Generates the membership (or non-membership) proof for the
    /// position of `hi` against the current root.
    ///
    /// The proof records one sibling per level that carries a non-empty
    /// sibling, deepest first, with a bitmap marking those levels. For an
    /// unoccupied position the result verifies against the empty digest
    /// as the leaf hash.
    pub fn prove(&self, hi: &NodeHash) -> Result<Proof, TreeError<S::Error>> {
        let path = index_path(self.num_levels, hi);
        let mut empties = [0u8; 32];
        let mut siblings: Vec<NodeHash> = Vec::new();

        let mut node_hash = self.root;
        for level in 0..self.num_levels - 1 {
            let record = self.get_record(node_hash)?;
            if record.kind == NodeKind::Final {
                if self.value_at(hi)?.is_none() {
                    // The final node parks a different leaf. Its subtree
                    // hash at the divergence level is the one non-empty
                    // sibling the verifier cannot reconstruct on its own,
                    // unless the final node sits on the queried path
                    // itself.
                    let incumbent_hi = hash_bytes(leaf_index(&record, node_hash)?);
                    let incumbent_path = index_path(self.num_levels, &incumbent_hi);
                    let pos_diff = compare_paths(&incumbent_path, &path)
                        .ok_or(TreeError::AlreadyExists)?;
                    if pos_diff != self.num_levels - 1 - level {
                        let sibling = fold_with_empty_siblings(
                            pos_diff,
                            &incumbent_path,
                            hash_bytes(&record.body),
                        );
                        crate::bitmap::set_bit(&mut empties, self.num_levels - 2 - pos_diff);
                        siblings.insert(0, sibling);
                    }
                }
                break;
            }

            let node = self.internal_children(&record, node_hash)?;
            let sibling;
            if !path[self.num_levels - level - 2] {
                node_hash = node.left;
                sibling = node.right;
            } else {
                node_hash = node.right;
                sibling = node.left;
            }
            if sibling != EMPTY_NODE_HASH {
                crate::bitmap::set_bit(&mut empties, level);
                siblings.insert(0, sibling);
            }
        }

        Ok(Proof::new(empties, siblings))
    }

    /// Renders the populated part of the tree as an indented listing, one
    /// node per line. A debugging aid; the output format is not stable.
    pub fn dump(&self) -> Result<String, TreeError<S::Error>> {
        let mut out = String::new();
        self.dump_node(&mut out, self.root, 0)?;
        let _ = writeln!(out, "root: {}", self.root);
        Ok(out)
    }

    /// Splits the subtree of a final node met at descent level `level` to
    /// make room for a colliding leaf, or rejects the insertion when the
    /// index hashes coincide.
    #[allow(clippy::too_many_arguments)]
    fn split_final(
        &mut self,
        incumbent: Record,
        incumbent_key: NodeHash,
        path: &[bool],
        level: usize,
        content_hash: NodeHash,
        index_len: u32,
        bytes: &[u8],
        mut siblings: Vec<NodeHash>,
    ) -> Result<(), TreeError<S::Error>> {
        let incumbent_hi = hash_bytes(leaf_index(&incumbent, incumbent_key)?);
        let incumbent_path = index_path(self.num_levels, &incumbent_hi);
        let pos_diff = match compare_paths(&incumbent_path, path) {
            // Same index hash: the position is taken.
            None => return Err(TreeError::AlreadyExists),
            Some(pos) => pos,
        };
        trace!(level, pos_diff, "splitting final node subtree");

        // Re-park both leaves at the divergence level and join them under
        // one internal node, the new leaf on the side its path bit picks.
        let incumbent_final =
            fold_with_empty_siblings(pos_diff, &incumbent_path, hash_bytes(&incumbent.body));
        self.put_record(incumbent_final, NodeKind::Final, incumbent.index_len, &incumbent.body)?;
        let new_final = fold_with_empty_siblings(pos_diff, path, content_hash);
        self.put_record(new_final, NodeKind::Final, index_len, bytes)?;

        let parent = if path[pos_diff] {
            InternalNode::new(incumbent_final, new_final)
        } else {
            InternalNode::new(new_final, incumbent_final)
        };

        // The levels between the collision and the divergence are empty on
        // both sides of the rebuilt branch.
        siblings.extend(std::iter::repeat(EMPTY_NODE_HASH).take(level - pos_diff));
        self.root = self.replace_leaf(
            &siblings,
            &path[pos_diff + 1..],
            parent.hash(),
            NodeKind::Internal,
            0,
            &parent.bytes(),
        )?;
        self.persist_root()
    }

    /// Writes a leaf (or a prebuilt subtree parent) and rebuilds the
    /// branch above it by combining with the recorded siblings.
    ///
    /// `siblings` was collected root-to-leaf; combination walks
    /// leaf-to-root, so it is consumed from the back. The returned digest
    /// is the new root.
    fn replace_leaf(
        &self,
        siblings: &[NodeHash],
        path: &[bool],
        leaf_hash: NodeHash,
        kind: NodeKind,
        index_len: u32,
        body: &[u8],
    ) -> Result<NodeHash, TreeError<S::Error>> {
        self.put_record(leaf_hash, kind, index_len, body)?;
        let mut current = leaf_hash;
        for (i, sibling) in siblings.iter().rev().enumerate() {
            let node = if !path[i] {
                InternalNode::new(current, *sibling)
            } else {
                InternalNode::new(*sibling, current)
            };
            let node_hash = node.hash();
            self.put_record(node_hash, NodeKind::Internal, 0, &node.bytes())?;
            current = node_hash;
        }
        Ok(current)
    }

    /// Publishes the in-memory root to the root record. Always the last
    /// write of a mutation.
    fn persist_root(&self) -> Result<(), TreeError<S::Error>> {
        self.put_record(*ROOT_RECORD_KEY, NodeKind::Root, 0, self.root.as_slice())?;
        debug!(root = %self.root, "root record updated");
        Ok(())
    }

    /// Stores a record under `key` in the `tag ‖ index_len ‖ body` layout.
    fn put_record(
        &self,
        key: NodeHash,
        kind: NodeKind,
        index_len: u32,
        body: &[u8],
    ) -> Result<(), TreeError<S::Error>> {
        self.store
            .put(key, &encode_record(kind, index_len, body))
            .map_err(TreeError::Store)
    }

    /// Fetches and decodes the record under `key`. The reserved empty
    /// digest yields the in-band empty record without touching the store.
    fn get_record(&self, key: NodeHash) -> Result<Record, TreeError<S::Error>> {
        if key == EMPTY_NODE_HASH {
            return Ok(Record::empty());
        }
        match self.store.get(key).map_err(TreeError::Store)? {
            Some(bytes) => Record::try_from(bytes.as_slice())
                .map_err(|reason| TreeError::Corrupt(key, reason)),
            None => Err(TreeError::NotFound(key)),
        }
    }

    /// Interprets a fetched record as an internal node. The empty record
    /// reads as a node with two empty children.
    fn internal_children(
        &self,
        record: &Record,
        key: NodeHash,
    ) -> Result<InternalNode, TreeError<S::Error>> {
        match record.kind {
            NodeKind::Empty => Ok(InternalNode::new(EMPTY_NODE_HASH, EMPTY_NODE_HASH)),
            NodeKind::Internal => InternalNode::try_from(record.body.as_slice())
                .map_err(|reason| TreeError::Corrupt(key, reason)),
            _ => Err(TreeError::Corrupt(key, "unexpected node kind on an internal path")),
        }
    }

    fn dump_node(
        &self,
        out: &mut String,
        node_hash: NodeHash,
        depth: usize,
    ) -> Result<(), TreeError<S::Error>> {
        let record = self.get_record(node_hash)?;
        let indent = "  ".repeat(depth);
        match record.kind {
            NodeKind::Empty => {
                let _ = writeln!(out, "{indent}level {depth} - [empty]");
            }
            NodeKind::Internal => {
                let node = self.internal_children(&record, node_hash)?;
                let _ = writeln!(
                    out,
                    "{indent}level {depth} - {node_hash} = {} | {}",
                    node.left, node.right
                );
                if depth + 1 < self.num_levels - 1 {
                    self.dump_node(out, node.left, depth + 1)?;
                    self.dump_node(out, node.right, depth + 1)?;
                }
            }
            NodeKind::Final => {
                let _ = writeln!(
                    out,
                    "{indent}level {depth} - {node_hash} = final leaf {}",
                    hash_bytes(&record.body)
                );
            }
            NodeKind::Value => {
                let _ = writeln!(out, "{indent}level {depth} - {node_hash} = value");
            }
            NodeKind::Root => {
                let _ = writeln!(out, "{indent}level {depth} - {node_hash} = root record");
            }
        }
        Ok(())
    }
}

/// The index prefix of a leaf record, or a corruption error naming the
/// offending key.
fn leaf_index<E>(record: &Record, key: NodeHash) -> Result<&[u8], TreeError<E>> {
    record
        .index()
        .ok_or(TreeError::Corrupt(key, "index length overruns leaf body"))
}
