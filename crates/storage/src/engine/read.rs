#![forbid(unsafe_code)]

use super::{EngineError, MemoEngine};
use crate::store::MemoStore;
use mg_core::graph::{
    annotated_revision_path, check_invariants, find_node, find_version, latest_at_or_before,
    latest_with_action, revision_path,
};
use mg_core::{
    ActionType, InvariantViolation, Memo, MemoId, MemoListItem, NodeId, RevisionPath, VersionNode,
    build_list_item,
};

impl<S: MemoStore> MemoEngine<S> {
    pub fn get_memo(&self, memo_id: &MemoId) -> Result<Memo, EngineError> {
        self.load_memo(memo_id)
    }

    /// A node of `memo_id`; ids that resolve to another memo's node are NotFound.
    pub fn get_node(&self, memo_id: &MemoId, node_id: &NodeId) -> Result<VersionNode, EngineError> {
        self.load_node(memo_id, node_id)
    }

    pub fn get_node_at_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<VersionNode, EngineError> {
        self.store
            .find_node_by_version(memo_id, version)?
            .ok_or_else(|| {
                EngineError::not_found(format_args!("version {version} (memo={memo_id})"))
            })
    }

    pub fn get_current_node(&self, memo_id: &MemoId) -> Result<VersionNode, EngineError> {
        let memo = self.load_memo(memo_id)?;
        self.load_node(memo_id, memo.current_node_id())
    }

    pub fn get_root_node(&self, memo_id: &MemoId) -> Result<VersionNode, EngineError> {
        let memo = self.load_memo(memo_id)?;
        self.load_node(memo_id, memo.root_node_id())
    }

    /// Every version of the memo, ascending.
    pub fn get_memo_history(&self, memo_id: &MemoId) -> Result<Vec<VersionNode>, EngineError> {
        self.load_memo(memo_id)?;
        let mut nodes = self.load_nodes(memo_id)?;
        nodes.sort_by_key(|node| node.version());
        Ok(nodes)
    }

    /// Direct children of `node_id`; NotFound unless the node belongs to `memo_id`.
    pub fn find_children(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<Vec<VersionNode>, EngineError> {
        self.load_node(memo_id, node_id)?;
        Ok(self.store.find_children(memo_id, node_id)?)
    }

    pub fn branch_count(&self, memo_id: &MemoId, node_id: &NodeId) -> Result<usize, EngineError> {
        Ok(self.find_children(memo_id, node_id)?.len())
    }

    /// The lowest-versioned child of `node_id`.
    pub fn navigate_next(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<VersionNode, EngineError> {
        self.find_children(memo_id, node_id)?
            .into_iter()
            .next()
            .ok_or(EngineError::InvalidOperation("no next version"))
    }

    /// The primary parent of `node_id`.
    pub fn navigate_previous(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<VersionNode, EngineError> {
        let node = self.load_node(memo_id, node_id)?;
        let Some(parent_id) = node.primary_parent() else {
            return Err(EngineError::InvalidOperation("no previous version"));
        };
        self.load_node(memo_id, parent_id)
    }

    /// State of the memo as of `timestamp_ms`. Ties on creation time resolve
    /// to the higher version.
    pub fn checkout_by_timestamp(
        &self,
        memo_id: &MemoId,
        timestamp_ms: i64,
    ) -> Result<VersionNode, EngineError> {
        self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        latest_at_or_before(&nodes, timestamp_ms)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format_args!(
                    "version at or before {timestamp_ms} (memo={memo_id})"
                ))
            })
    }

    pub fn checkout_by_action(
        &self,
        memo_id: &MemoId,
        action: ActionType,
    ) -> Result<VersionNode, EngineError> {
        self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        latest_with_action(&nodes, action)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format_args!("{action} version (memo={memo_id})"))
            })
    }

    /// Pre-order walk of the subtree under `from_version`, or under the root.
    pub fn revision_path(
        &self,
        memo_id: &MemoId,
        from_version: Option<u32>,
    ) -> Result<Vec<VersionNode>, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        let start = walk_start(&memo, &nodes, from_version)?;
        Ok(revision_path(&nodes, &start).into_iter().cloned().collect())
    }

    pub fn annotated_revision_path(
        &self,
        memo_id: &MemoId,
        from_version: Option<u32>,
    ) -> Result<RevisionPath, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        let start = walk_start(&memo, &nodes, from_version)?;
        annotated_revision_path(&nodes, &start)
            .ok_or_else(|| EngineError::not_found(format_args!("node {start} (memo={memo_id})")))
    }

    /// Memos in which `user_id` appears as sender, recipient or assignee on any
    /// version, oldest first.
    pub fn list_user_memos(&self, user_id: &str) -> Result<Vec<MemoListItem>, EngineError> {
        let memo_ids = self.store.find_memos_by_user(user_id)?;
        let mut items = Vec::with_capacity(memo_ids.len());
        for memo_id in &memo_ids {
            let memo = self.load_memo(memo_id)?;
            let nodes = self.load_nodes(memo_id)?;
            let current = find_node(&nodes, memo.current_node_id()).ok_or_else(|| {
                EngineError::not_found(format_args!(
                    "node {} (memo={memo_id})",
                    memo.current_node_id()
                ))
            })?;
            items.push(build_list_item(&memo, current, nodes.len()));
        }
        items.sort_by(|a, b| (a.created_at_ms, &a.id).cmp(&(b.created_at_ms, &b.id)));
        Ok(items)
    }

    /// Checks the stored graph of one memo; an empty result means it is sound.
    pub fn verify(&self, memo_id: &MemoId) -> Result<Vec<InvariantViolation>, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        let violations = check_invariants(&memo, &nodes);
        if !violations.is_empty() {
            tracing::warn!(
                memo_id = %memo_id,
                violations = violations.len(),
                first = %violations[0],
                "memo graph failed verification"
            );
        }
        Ok(violations)
    }
}

fn walk_start(
    memo: &Memo,
    nodes: &[VersionNode],
    from_version: Option<u32>,
) -> Result<NodeId, EngineError> {
    match from_version {
        None => Ok(memo.root_node_id().clone()),
        Some(version) => find_version(nodes, version)
            .map(|node| node.id().clone())
            .ok_or_else(|| {
                EngineError::not_found(format_args!("version {version} (memo={})", memo.id()))
            }),
    }
}
