#![forbid(unsafe_code)]

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use mg_core::graph::children_of;
use mg_core::{Memo, MemoId, NodeId, VersionNode};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of an optimistic append.
#[derive(Clone, Debug, PartialEq)]
pub enum AppendOutcome {
    /// Node persisted and the pointer moved; carries the updated memo.
    Appended(Memo),
    /// The pointer no longer matched, or the version was already taken.
    /// Nothing was written.
    Conflict,
}

/// Durable home of memo control records and their immutable version nodes.
///
/// Nodes are insert-only. The only mutable datum is a memo's current pointer,
/// which moves through [`MemoStore::append_node`] as a compare-and-swap.
pub trait MemoStore: Send + Sync {
    fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError>;

    /// Upsert. The root pointer of an existing memo is never rewritten.
    fn put_memo(&self, memo: &Memo) -> Result<(), StoreError>;

    fn get_node(&self, id: &NodeId) -> Result<Option<VersionNode>, StoreError>;

    /// Insert-only; a taken id or `(memo_id, version)` pair is rejected.
    fn put_node(&self, node: &VersionNode) -> Result<(), StoreError>;

    /// All nodes of a memo, ascending by version.
    fn find_nodes_by_memo(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, StoreError>;

    /// Memos where the user is sender, recipient or assignee on any version.
    fn find_memos_by_user(&self, user_id: &str) -> Result<BTreeSet<MemoId>, StoreError>;

    fn find_node_by_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<Option<VersionNode>, StoreError> {
        Ok(self
            .find_nodes_by_memo(memo_id)?
            .into_iter()
            .find(|node| node.version() == version))
    }

    fn find_children(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<Vec<VersionNode>, StoreError> {
        let nodes = self.find_nodes_by_memo(memo_id)?;
        Ok(children_of(&nodes, node_id).into_iter().cloned().collect())
    }

    /// Persists a root node and its memo as one unit.
    fn create_memo(&self, memo: &Memo, root: &VersionNode) -> Result<(), StoreError>;

    /// Inserts `node` and moves the memo's pointer from `expected_current` to it,
    /// atomically. Returns [`AppendOutcome::Conflict`] without writing anything
    /// when another writer got there first.
    fn append_node(
        &self,
        node: &VersionNode,
        expected_current: &NodeId,
        updated_at_ms: i64,
    ) -> Result<AppendOutcome, StoreError>;
}

impl<S: MemoStore + ?Sized> MemoStore for Arc<S> {
    fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError> {
        (**self).get_memo(id)
    }

    fn put_memo(&self, memo: &Memo) -> Result<(), StoreError> {
        (**self).put_memo(memo)
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<VersionNode>, StoreError> {
        (**self).get_node(id)
    }

    fn put_node(&self, node: &VersionNode) -> Result<(), StoreError> {
        (**self).put_node(node)
    }

    fn find_nodes_by_memo(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, StoreError> {
        (**self).find_nodes_by_memo(memo_id)
    }

    fn find_memos_by_user(&self, user_id: &str) -> Result<BTreeSet<MemoId>, StoreError> {
        (**self).find_memos_by_user(user_id)
    }

    fn find_node_by_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<Option<VersionNode>, StoreError> {
        (**self).find_node_by_version(memo_id, version)
    }

    fn find_children(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<Vec<VersionNode>, StoreError> {
        (**self).find_children(memo_id, node_id)
    }

    fn create_memo(&self, memo: &Memo, root: &VersionNode) -> Result<(), StoreError> {
        (**self).create_memo(memo, root)
    }

    fn append_node(
        &self,
        node: &VersionNode,
        expected_current: &NodeId,
        updated_at_ms: i64,
    ) -> Result<AppendOutcome, StoreError> {
        (**self).append_node(node, expected_current, updated_at_ms)
    }
}
