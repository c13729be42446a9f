#![forbid(unsafe_code)]

use super::{AppendOutcome, MemoStore, StoreError};
use mg_core::{Memo, MemoId, NodeId, VersionNode};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryState {
    memos: HashMap<MemoId, Memo>,
    nodes: HashMap<NodeId, VersionNode>,
    versions: HashMap<MemoId, BTreeMap<u32, NodeId>>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl MemoryState {
    fn check_insert(&self, node: &VersionNode) -> Result<(), StoreError> {
        if self.nodes.contains_key(node.id()) {
            return Err(StoreError::AlreadyExists);
        }
        let taken = self
            .versions
            .get(node.memo_id())
            .is_some_and(|versions| versions.contains_key(&node.version()));
        if taken {
            return Err(StoreError::DuplicateVersion {
                memo_id: node.memo_id().to_string(),
                version: node.version(),
            });
        }
        if node
            .parent_node_ids()
            .iter()
            .any(|parent| !self.nodes.contains_key(parent))
        {
            return Err(StoreError::InvalidInput("parent node is missing"));
        }
        Ok(())
    }

    fn check_pointers(&self, memo: &Memo) -> Result<(), StoreError> {
        let owned = |id: &NodeId| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.memo_id() == memo.id())
        };
        if owned(memo.root_node_id()) && owned(memo.current_node_id()) {
            Ok(())
        } else {
            Err(StoreError::InvalidInput("memo pointer must name a node of the memo"))
        }
    }

    fn insert_node(&mut self, node: &VersionNode) {
        self.versions
            .entry(node.memo_id().clone())
            .or_default()
            .insert(node.version(), node.id().clone());
        for parent in node.parent_node_ids() {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(node.id().clone());
        }
        self.nodes.insert(node.id().clone(), node.clone());
    }
}

/// In-process store. All state sits behind one lock, so every trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    failures_pending: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` store calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn node_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.nodes.len())
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        let consumed = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(1)
            })
            .is_ok();
        if consumed {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.injected_failure()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.injected_failure()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl MemoStore for MemoryStore {
    fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError> {
        Ok(self.read()?.memos.get(id).cloned())
    }

    fn put_memo(&self, memo: &Memo) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = match state.memos.get(memo.id()) {
            Some(existing) => existing.advanced_to(memo.current_node_id().clone(), memo.updated_at_ms()),
            None => memo.clone(),
        };
        state.check_pointers(&stored)?;
        state.memos.insert(memo.id().clone(), stored);
        Ok(())
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<VersionNode>, StoreError> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    fn put_node(&self, node: &VersionNode) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.check_insert(node)?;
        state.insert_node(node);
        Ok(())
    }

    fn find_nodes_by_memo(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, StoreError> {
        let state = self.read()?;
        let Some(versions) = state.versions.get(memo_id) else {
            return Ok(Vec::new());
        };
        Ok(versions
            .values()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect())
    }

    fn find_memos_by_user(&self, user_id: &str) -> Result<BTreeSet<MemoId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .nodes
            .values()
            .filter(|node| node.involves(user_id))
            .map(|node| node.memo_id().clone())
            .collect())
    }

    fn find_node_by_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<Option<VersionNode>, StoreError> {
        let state = self.read()?;
        Ok(state
            .versions
            .get(memo_id)
            .and_then(|versions| versions.get(&version))
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    fn find_children(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<Vec<VersionNode>, StoreError> {
        let state = self.read()?;
        let mut out = state
            .children
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.nodes.get(id))
            .filter(|node| node.memo_id() == memo_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| {
            (a.version(), a.created_at_ms(), a.id()).cmp(&(b.version(), b.created_at_ms(), b.id()))
        });
        Ok(out)
    }

    fn create_memo(&self, memo: &Memo, root: &VersionNode) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.memos.contains_key(memo.id()) {
            return Err(StoreError::AlreadyExists);
        }
        state.check_insert(root)?;
        state.insert_node(root);
        state.memos.insert(memo.id().clone(), memo.clone());
        Ok(())
    }

    fn append_node(
        &self,
        node: &VersionNode,
        expected_current: &NodeId,
        updated_at_ms: i64,
    ) -> Result<AppendOutcome, StoreError> {
        let mut state = self.write()?;
        let Some(memo) = state.memos.get(node.memo_id()) else {
            return Err(StoreError::UnknownId);
        };
        if memo.current_node_id() != expected_current {
            return Ok(AppendOutcome::Conflict);
        }
        match state.check_insert(node) {
            Ok(()) => {}
            Err(StoreError::DuplicateVersion { .. }) => return Ok(AppendOutcome::Conflict),
            Err(err) => return Err(err),
        }

        let advanced = memo.advanced_to(node.id().clone(), updated_at_ms);
        state.insert_node(node);
        state.memos.insert(advanced.id().clone(), advanced.clone());
        Ok(AppendOutcome::Appended(advanced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::{MutationIntent, NewMemo};

    fn seeded(store: &MemoryStore) -> (Memo, VersionNode) {
        let root = VersionNode::root(
            NodeId::try_new("n1").unwrap(),
            MemoId::try_new("m1").unwrap(),
            NewMemo::new("t", "c", "alice", "bob"),
            10,
        );
        let memo = Memo::new(&root);
        store.create_memo(&memo, &root).unwrap();
        (memo, root)
    }

    fn comment(parent: &VersionNode, id: &str) -> VersionNode {
        MutationIntent::Comment {
            comment: "c".to_string(),
        }
        .apply(parent, NodeId::try_new(id).unwrap(), "bob", 20)
        .unwrap()
    }

    #[test]
    fn append_moves_the_pointer_only_from_the_expected_node() {
        let store = MemoryStore::new();
        let (memo, root) = seeded(&store);

        let first = comment(&root, "n2");
        let AppendOutcome::Appended(advanced) = store.append_node(&first, root.id(), 20).unwrap()
        else {
            panic!("first append must win");
        };
        assert_eq!(advanced.current_node_id(), first.id());

        let stale = comment(&root, "n3");
        assert_eq!(
            store.append_node(&stale, root.id(), 21).unwrap(),
            AppendOutcome::Conflict
        );
        assert_eq!(store.node_count().unwrap(), 2);
        assert_eq!(
            store.get_memo(memo.id()).unwrap().unwrap().current_node_id(),
            first.id()
        );
    }

    #[test]
    fn insert_only_rules_hold() {
        let store = MemoryStore::new();
        let (_, root) = seeded(&store);

        assert!(matches!(store.put_node(&root), Err(StoreError::AlreadyExists)));
        store.put_node(&comment(&root, "n2")).unwrap();
        assert!(matches!(
            store.put_node(&comment(&root, "n3")),
            Err(StoreError::DuplicateVersion { version: 2, .. })
        ));

        let phantom = comment(&comment(&root, "nx"), "ny");
        assert!(matches!(
            store.put_node(&phantom),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        let (memo, _) = seeded(&store);

        store.fail_next(2);
        assert!(matches!(store.get_memo(memo.id()), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.get_memo(memo.id()), Err(StoreError::Unavailable(_))));
        assert!(store.get_memo(memo.id()).unwrap().is_some());
    }

    #[test]
    fn children_and_users_are_indexed() {
        let store = MemoryStore::new();
        let (memo, root) = seeded(&store);
        let child = comment(&root, "n2");
        store.append_node(&child, root.id(), 20).unwrap();

        assert_eq!(
            store.find_children(memo.id(), root.id()).unwrap(),
            vec![child.clone()]
        );
        assert_eq!(
            store.find_node_by_version(memo.id(), 2).unwrap(),
            Some(child)
        );
        assert!(store.find_memos_by_user("alice").unwrap().contains(memo.id()));
        assert!(store.find_memos_by_user("zed").unwrap().is_empty());
    }
}
