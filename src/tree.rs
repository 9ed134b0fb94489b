//! Public API: a B+ tree of fixed-size keys and values backed by
//! [`crate::storage::memory::PagedMemory`].
//!
//! The insert/split walk mirrors the teacher's in-memory
//! `src/index/btree.rs` (`insert_recursive`/`split_leaf`/`split_internal`),
//! generalized from recursion over owned `Vec<Node>` to an explicit
//! root-to-leaf stack over paged, possibly-disk-backed nodes (recursion
//! would need to borrow `self.memory` mutably at every stack frame, which
//! the paged backend can't support the way an in-process `Vec` can).

use crate::error::{TreeError, TreeResult};
use crate::node::Node;
use crate::serialization::serializer::Serializer;
use crate::storage::memory::{FileMemory, InMemory, Metadata, PagedMemory, TreeConf};
use crate::storage::page::PageId;
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeState {
    Open,
    Closing,
    Closed,
}

/// A comparison operator for [`Tree::get_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

/// The lower-bound operator for [`Tree::get_records_range`] (`v1` side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBound {
    Gt,
    Ge,
    Eq,
}

/// The upper-bound operator for [`Tree::get_records_range`] (`v2` side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpperBound {
    Lt,
    Le,
    Eq,
}

pub struct Tree<M: PagedMemory, S: Serializer> {
    memory: M,
    serializer: S,
    state: TreeState,
}

impl<S: Serializer> Tree<FileMemory, S> {
    /// Open (or create) a file-backed tree.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        path: impl AsRef<Path>,
        page_size: usize,
        order: usize,
        key_size: usize,
        value_size: usize,
        serializer: S,
    ) -> TreeResult<Self> {
        Self::open_with_cache(
            path,
            page_size,
            order,
            key_size,
            value_size,
            serializer,
            crate::storage::memory::DEFAULT_CACHE_CAPACITY,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open_with_cache(
        path: impl AsRef<Path>,
        page_size: usize,
        order: usize,
        key_size: usize,
        value_size: usize,
        serializer: S,
        cache_capacity: usize,
    ) -> TreeResult<Self> {
        if order < 2 {
            return Err(TreeError::invalid_argument("order must be at least 2"));
        }
        let conf = TreeConf {
            page_size,
            order,
            key_size,
            value_size,
            serializer_tag: serializer.tag(),
        };
        let memory = FileMemory::open(path, conf, cache_capacity)?;
        info!(
            "tree opened: order={order} key_size={key_size} value_size={value_size} page_size={page_size}"
        );
        Ok(Tree {
            memory,
            serializer,
            state: TreeState::Open,
        })
    }
}

impl<S: Serializer> Tree<InMemory, S> {
    /// Build a tree over a fresh in-memory backend. Used by tests that
    /// exercise tree logic without touching the filesystem.
    pub fn in_memory(
        order: usize,
        key_size: usize,
        value_size: usize,
        serializer: S,
    ) -> TreeResult<Self> {
        if order < 2 {
            return Err(TreeError::invalid_argument("order must be at least 2"));
        }
        let mut memory = InMemory::new();
        let root_page = memory.next_available_page();
        memory.set_node(&Node::new_leaf(root_page))?;
        memory.set_metadata(Metadata {
            conf: TreeConf {
                page_size: 0,
                order,
                key_size,
                value_size,
                serializer_tag: serializer.tag(),
            },
            root_page_no: root_page,
            entry_count: 0,
        })?;

        Ok(Tree {
            memory,
            serializer,
            state: TreeState::Open,
        })
    }
}

impl<M: PagedMemory, S: Serializer> Tree<M, S> {
    fn require_open(&self) -> TreeResult<()> {
        match self.state {
            TreeState::Open => Ok(()),
            TreeState::Closing | TreeState::Closed => Err(TreeError::ClosedTree),
        }
    }

    fn key_size(&mut self) -> TreeResult<usize> {
        Ok(self.memory.get_metadata()?.conf.key_size)
    }

    fn value_size(&mut self) -> TreeResult<usize> {
        Ok(self.memory.get_metadata()?.conf.value_size)
    }

    /// Walk from the root to the leaf that would contain `key_bytes`,
    /// returning the leaf's page and the stack of ancestor pages visited
    /// (root first), used to propagate splits back up without parent
    /// pointers on the node itself.
    fn descend_to_leaf(&mut self, key_bytes: &[u8]) -> TreeResult<(PageId, Vec<PageId>)> {
        let metadata = self.memory.get_metadata()?;
        let mut ancestors = Vec::new();
        let mut current = metadata.root_page_no;
        loop {
            let node = self.memory.get_node(current)?;
            match node {
                Node::Leaf { .. } => return Ok((current, ancestors)),
                Node::Internal { .. } => {
                    let next = node.child_for(key_bytes);
                    ancestors.push(current);
                    current = next;
                }
            }
        }
    }

    fn bump_entry_count(&mut self, delta: i64) -> TreeResult<()> {
        let mut metadata = self.memory.get_metadata()?;
        metadata.entry_count = (metadata.entry_count as i64 + delta).max(0) as u64;
        self.memory.set_metadata(metadata)
    }

    fn insert_bytes(&mut self, key_bytes: Vec<u8>, value: Vec<u8>) -> TreeResult<()> {
        let metadata = self.memory.get_metadata()?;
        let order = metadata.conf.order;
        let (leaf_id, ancestors) = self.descend_to_leaf(&key_bytes)?;

        let mut leaf = self.memory.get_node(leaf_id)?;
        let replaced = leaf.leaf_insert(key_bytes, value);

        if !leaf.needs_split(order) {
            self.memory.set_node(&leaf)?;
            if !replaced {
                self.bump_entry_count(1)?;
            }
            return Ok(());
        }

        let new_leaf_id = self.memory.next_available_page();
        let (mut separator, right) = leaf.split(new_leaf_id);
        self.memory.set_node(&leaf)?;
        self.memory.set_node(&right)?;
        if !replaced {
            self.bump_entry_count(1)?;
        }
        debug!("leaf {leaf_id} split, new sibling {new_leaf_id}");

        let mut promoted_child = new_leaf_id;
        for &ancestor_id in ancestors.iter().rev() {
            let mut ancestor = self.memory.get_node(ancestor_id)?;
            ancestor.internal_insert(separator.clone(), promoted_child);

            if !ancestor.needs_split(order) {
                self.memory.set_node(&ancestor)?;
                return Ok(());
            }

            let new_ancestor_id = self.memory.next_available_page();
            let (promoted_key, right_ancestor) = ancestor.split(new_ancestor_id);
            self.memory.set_node(&ancestor)?;
            self.memory.set_node(&right_ancestor)?;
            debug!("internal {ancestor_id} split, new sibling {new_ancestor_id}");

            separator = promoted_key;
            promoted_child = new_ancestor_id;
        }

        let new_root_id = self.memory.next_available_page();
        let mut new_root = Node::new_internal(new_root_id, metadata.root_page_no);
        new_root.internal_insert(separator, promoted_child);
        self.memory.set_node(&new_root)?;
        let latest = self.memory.get_metadata()?;
        self.memory.set_metadata(Metadata {
            root_page_no: new_root_id,
            ..latest
        })?;
        info!("root split, new root is page {new_root_id}");
        Ok(())
    }

    /// Insert `key`, or replace its value if already present.
    pub fn insert(&mut self, key: &S::Value, value: &[u8]) -> TreeResult<()> {
        self.require_open()?;
        let key_size = self.key_size()?;
        let value_size = self.value_size()?;
        if value.len() != value_size {
            return Err(TreeError::invalid_argument(format!(
                "value is {} bytes, tree expects {value_size}",
                value.len()
            )));
        }
        let key_bytes = self.serializer.serialize(key, key_size)?;

        let result = self.insert_bytes(key_bytes, value.to_vec());
        match result {
            Ok(()) => self.memory.commit(),
            Err(err) => {
                self.memory.rollback()?;
                Err(err)
            }
        }
    }

    /// Insert every pair, wrapped in a single commit. `pairs` is assumed
    /// sorted ascending by key but this is not required for correctness.
    pub fn batch_insert(&mut self, pairs: &[(S::Value, Vec<u8>)]) -> TreeResult<()> {
        self.require_open()?;
        let key_size = self.key_size()?;
        let value_size = self.value_size()?;

        let result = (|| {
            for (key, value) in pairs {
                if value.len() != value_size {
                    return Err(TreeError::invalid_argument(format!(
                        "value is {} bytes, tree expects {value_size}",
                        value.len()
                    )));
                }
                let key_bytes = self.serializer.serialize(key, key_size)?;
                self.insert_bytes(key_bytes, value.clone())?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => self.memory.commit(),
            Err(err) => {
                self.memory.rollback()?;
                Err(err)
            }
        }
    }

    /// Exact-match point lookup. Read-only: no WAL writes.
    pub fn get_record(&mut self, key: &S::Value) -> TreeResult<Option<Vec<u8>>> {
        self.require_open()?;
        let key_size = self.key_size()?;
        let key_bytes = self.serializer.serialize(key, key_size)?;
        let (leaf_id, _) = self.descend_to_leaf(&key_bytes)?;
        let leaf = self.memory.get_node(leaf_id)?;
        Ok(leaf.leaf_lookup(&key_bytes).map(|v| v.to_vec()))
    }

    /// Leftmost leaf of the tree, used as the starting point for scans.
    fn leftmost_leaf(&mut self) -> TreeResult<PageId> {
        let metadata = self.memory.get_metadata()?;
        let mut current = metadata.root_page_no;
        loop {
            let node = self.memory.get_node(current)?;
            match node {
                Node::Leaf { .. } => return Ok(current),
                Node::Internal { first_child, .. } => current = first_child,
            }
        }
    }

    /// All entries whose key satisfies `key <op> value`, in ascending key
    /// order.
    pub fn get_records(&mut self, op: CompareOp, value: &S::Value) -> TreeResult<Vec<Vec<u8>>> {
        self.require_open()?;
        let key_size = self.key_size()?;
        let pivot = self.serializer.serialize(value, key_size)?;

        let mut results = Vec::new();
        match op {
            CompareOp::Gt | CompareOp::Ge => {
                let (mut leaf_id, _) = self.descend_to_leaf(&pivot)?;
                loop {
                    let leaf = self.memory.get_node(leaf_id)?;
                    let Node::Leaf { entries, next_page, .. } = leaf else {
                        unreachable!()
                    };
                    for entry in &entries {
                        let satisfies = match op {
                            CompareOp::Gt => entry.key.as_slice() > pivot.as_slice(),
                            CompareOp::Ge => entry.key.as_slice() >= pivot.as_slice(),
                            _ => unreachable!(),
                        };
                        if satisfies {
                            results.push(entry.value.clone());
                        }
                    }
                    if next_page == 0 {
                        break;
                    }
                    leaf_id = next_page;
                }
            }
            CompareOp::Lt | CompareOp::Le => {
                let mut leaf_id = self.leftmost_leaf()?;
                'outer: loop {
                    let leaf = self.memory.get_node(leaf_id)?;
                    let Node::Leaf { entries, next_page, .. } = leaf else {
                        unreachable!()
                    };
                    for entry in &entries {
                        let satisfies = match op {
                            CompareOp::Lt => entry.key.as_slice() < pivot.as_slice(),
                            CompareOp::Le => entry.key.as_slice() <= pivot.as_slice(),
                            _ => unreachable!(),
                        };
                        if !satisfies {
                            break 'outer;
                        }
                        results.push(entry.value.clone());
                    }
                    if next_page == 0 {
                        break;
                    }
                    leaf_id = next_page;
                }
            }
        }
        Ok(results)
    }

    /// All entries whose key satisfies `v1 <op1> key <op2> v2`.
    pub fn get_records_range(
        &mut self,
        v1: &S::Value,
        op1: LowerBound,
        v2: &S::Value,
        op2: UpperBound,
    ) -> TreeResult<Vec<Vec<u8>>> {
        self.require_open()?;
        let key_size = self.key_size()?;
        let lower = self.serializer.serialize(v1, key_size)?;
        let upper = self.serializer.serialize(v2, key_size)?;

        if lower > upper {
            return Err(TreeError::invalid_argument("v1 must be <= v2"));
        }

        let (mut leaf_id, _) = self.descend_to_leaf(&lower)?;
        let mut results = Vec::new();

        'outer: loop {
            let leaf = self.memory.get_node(leaf_id)?;
            let Node::Leaf { entries, next_page, .. } = leaf else {
                unreachable!()
            };
            for entry in &entries {
                let key = entry.key.as_slice();
                let lower_ok = match op1 {
                    LowerBound::Gt => key > lower.as_slice(),
                    LowerBound::Ge => key >= lower.as_slice(),
                    LowerBound::Eq => key == lower.as_slice(),
                };
                let upper_ok = match op2 {
                    UpperBound::Lt => key < upper.as_slice(),
                    UpperBound::Le => key <= upper.as_slice(),
                    UpperBound::Eq => key == upper.as_slice(),
                };
                if !upper_ok {
                    break 'outer;
                }
                if lower_ok {
                    results.push(entry.value.clone());
                }
            }
            if next_page == 0 {
                break;
            }
            leaf_id = next_page;
        }
        Ok(results)
    }

    /// A fresh, non-restartable traversal of every `(key, value)` pair in
    /// ascending key order.
    pub fn items(&mut self) -> TreeResult<Vec<(S::Value, Vec<u8>)>> {
        self.require_open()?;
        let mut leaf_id = self.leftmost_leaf()?;
        let mut out = Vec::new();
        loop {
            let leaf = self.memory.get_node(leaf_id)?;
            let Node::Leaf { entries, next_page, .. } = leaf else {
                unreachable!()
            };
            for entry in &entries {
                let key = self.serializer.deserialize(&entry.key)?;
                out.push((key, entry.value.clone()));
            }
            if next_page == 0 {
                break;
            }
            leaf_id = next_page;
        }
        Ok(out)
    }

    /// Number of entries currently in the tree, maintained incrementally.
    pub fn len(&mut self) -> TreeResult<u64> {
        self.require_open()?;
        Ok(self.memory.get_metadata()?.entry_count)
    }

    pub fn is_empty(&mut self) -> TreeResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Checkpoint the WAL and release resources. Idempotent.
    pub fn close(&mut self) -> TreeResult<()> {
        if self.state == TreeState::Closed {
            return Ok(());
        }
        self.state = TreeState::Closing;
        self.memory.close()?;
        self.state = TreeState::Closed;
        info!("tree closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::serializer::{IntSerializer, UIntSerializer};

    #[test]
    fn insert_and_get_record_round_trip() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        tree.insert(&1, &[1; 8]).unwrap();
        tree.insert(&2, &[2; 8]).unwrap();

        assert_eq!(tree.get_record(&1).unwrap(), Some(vec![1; 8]));
        assert_eq!(tree.get_record(&2).unwrap(), Some(vec![2; 8]));
        assert_eq!(tree.get_record(&3).unwrap(), None);
    }

    #[test]
    fn duplicate_insert_replaces_value_and_does_not_bump_len() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        tree.insert(&1, &[1; 8]).unwrap();
        tree.insert(&1, &[9; 8]).unwrap();

        assert_eq!(tree.len().unwrap(), 1);
        assert_eq!(tree.get_record(&1).unwrap(), Some(vec![9; 8]));
    }

    #[test]
    fn insert_cascades_splits_up_to_a_new_root() {
        let mut tree = Tree::in_memory(3, 8, 8, UIntSerializer).unwrap();
        for key in 0..30u64 {
            tree.insert(&key, &key.to_be_bytes()).unwrap();
        }

        assert_eq!(tree.len().unwrap(), 30);
        for key in 0..30u64 {
            assert_eq!(tree.get_record(&key).unwrap(), Some(key.to_be_bytes().to_vec()));
        }
    }

    #[test]
    fn items_iterates_in_ascending_key_order_across_leaves() {
        let mut tree = Tree::in_memory(3, 8, 8, UIntSerializer).unwrap();
        for key in (0..20u64).rev() {
            tree.insert(&key, &key.to_be_bytes()).unwrap();
        }

        let items = tree.items().unwrap();
        let keys: Vec<u64> = items.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (0..20u64).collect::<Vec<_>>());
    }

    #[test]
    fn get_records_supports_every_operator() {
        let mut tree = Tree::in_memory(4, 8, 8, IntSerializer).unwrap();
        for key in -5..5i64 {
            tree.insert(&key, &key.to_be_bytes()).unwrap();
        }

        let gt = tree.get_records(CompareOp::Gt, &2).unwrap();
        assert_eq!(gt, vec![3i64.to_be_bytes().to_vec(), 4i64.to_be_bytes().to_vec()]);

        let ge = tree.get_records(CompareOp::Ge, &3).unwrap();
        assert_eq!(ge, vec![3i64.to_be_bytes().to_vec(), 4i64.to_be_bytes().to_vec()]);

        let lt = tree.get_records(CompareOp::Lt, &-3).unwrap();
        assert_eq!(lt, vec![(-5i64).to_be_bytes().to_vec(), (-4i64).to_be_bytes().to_vec()]);

        let le = tree.get_records(CompareOp::Le, &-4).unwrap();
        assert_eq!(le, vec![(-5i64).to_be_bytes().to_vec(), (-4i64).to_be_bytes().to_vec()]);
    }

    #[test]
    fn get_records_range_respects_both_bounds() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        for key in 0..10u64 {
            tree.insert(&key, &key.to_be_bytes()).unwrap();
        }

        let inclusive = tree
            .get_records_range(&3, LowerBound::Ge, &6, UpperBound::Le)
            .unwrap();
        assert_eq!(
            inclusive,
            vec![
                3u64.to_be_bytes().to_vec(),
                4u64.to_be_bytes().to_vec(),
                5u64.to_be_bytes().to_vec(),
                6u64.to_be_bytes().to_vec(),
            ]
        );

        let exclusive = tree
            .get_records_range(&3, LowerBound::Gt, &6, UpperBound::Lt)
            .unwrap();
        assert_eq!(exclusive, vec![4u64.to_be_bytes().to_vec(), 5u64.to_be_bytes().to_vec()]);
    }

    #[test]
    fn get_records_range_rejects_inverted_bounds() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        tree.insert(&1, &[0; 8]).unwrap();
        assert!(tree
            .get_records_range(&5, LowerBound::Ge, &1, UpperBound::Le)
            .is_err());
    }

    #[test]
    fn operations_on_a_closed_tree_return_closed_tree_error() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        tree.insert(&1, &[0; 8]).unwrap();
        tree.close().unwrap();

        assert!(matches!(tree.get_record(&1), Err(TreeError::ClosedTree)));
        assert!(matches!(tree.insert(&2, &[0; 8]), Err(TreeError::ClosedTree)));
    }

    #[test]
    fn insert_rejects_wrong_size_value() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        assert!(tree.insert(&1, &[0; 4]).is_err());
    }

    #[test]
    fn batch_insert_commits_all_pairs_together() {
        let mut tree = Tree::in_memory(4, 8, 8, UIntSerializer).unwrap();
        let pairs: Vec<(u64, Vec<u8>)> = (0..12u64).map(|k| (k, k.to_be_bytes().to_vec())).collect();
        tree.batch_insert(&pairs).unwrap();

        assert_eq!(tree.len().unwrap(), 12);
        for key in 0..12u64 {
            assert_eq!(tree.get_record(&key).unwrap(), Some(key.to_be_bytes().to_vec()));
        }
    }
}
