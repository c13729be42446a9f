#![forbid(unsafe_code)]

use super::{EngineError, MemoEngine};
use crate::store::MemoStore;
use mg_core::graph::{find_node, find_version};
use mg_core::{
    ActionType, Memo, MemoComparison, MemoId, MemoView, NodeId, TimelineView, VersionNode,
    build_timeline, diff, versions_between,
};

impl<S: MemoStore> MemoEngine<S> {
    /// Enriches `node` with navigation context from the memo's stored graph.
    pub fn build_view(&self, memo: &Memo, node: &VersionNode) -> Result<MemoView, EngineError> {
        let nodes = self.load_nodes(memo.id())?;
        Ok(mg_core::build_view(memo, node, &nodes))
    }

    pub fn view_version(&self, memo_id: &MemoId, version: u32) -> Result<MemoView, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let node = self.get_node_at_version(memo_id, version)?;
        self.build_view(&memo, &node)
    }

    /// Same as [`MemoEngine::view_version`].
    pub fn get_memo_at_version(
        &self,
        memo_id: &MemoId,
        version: u32,
    ) -> Result<MemoView, EngineError> {
        self.view_version(memo_id, version)
    }

    pub fn view_node(&self, memo_id: &MemoId, node_id: &NodeId) -> Result<MemoView, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let node = self.load_node(memo_id, node_id)?;
        self.build_view(&memo, &node)
    }

    pub fn view_latest(&self, memo_id: &MemoId) -> Result<MemoView, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let node = self.load_node(memo_id, memo.current_node_id())?;
        self.build_view(&memo, &node)
    }

    pub fn view_root(&self, memo_id: &MemoId) -> Result<MemoView, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let node = self.load_node(memo_id, memo.root_node_id())?;
        self.build_view(&memo, &node)
    }

    pub fn view_at_timestamp(
        &self,
        memo_id: &MemoId,
        timestamp_ms: i64,
    ) -> Result<MemoView, EngineError> {
        let node = self.checkout_by_timestamp(memo_id, timestamp_ms)?;
        let memo = self.load_memo(memo_id)?;
        self.build_view(&memo, &node)
    }

    pub fn view_by_action(
        &self,
        memo_id: &MemoId,
        action: ActionType,
    ) -> Result<MemoView, EngineError> {
        let node = self.checkout_by_action(memo_id, action)?;
        let memo = self.load_memo(memo_id)?;
        self.build_view(&memo, &node)
    }

    pub fn view_next(&self, memo_id: &MemoId, node_id: &NodeId) -> Result<MemoView, EngineError> {
        let node = self.navigate_next(memo_id, node_id)?;
        let memo = self.load_memo(memo_id)?;
        self.build_view(&memo, &node)
    }

    pub fn view_previous(
        &self,
        memo_id: &MemoId,
        node_id: &NodeId,
    ) -> Result<MemoView, EngineError> {
        let node = self.navigate_previous(memo_id, node_id)?;
        let memo = self.load_memo(memo_id)?;
        self.build_view(&memo, &node)
    }

    /// Views of both versions plus what changed going from `version_a` to `version_b`.
    pub fn compare_versions(
        &self,
        memo_id: &MemoId,
        version_a: u32,
        version_b: u32,
    ) -> Result<MemoComparison, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        let a = version_of(&nodes, memo_id, version_a)?;
        let b = version_of(&nodes, memo_id, version_b)?;

        Ok(MemoComparison {
            version_a: mg_core::build_view(&memo, a, &nodes),
            version_b: mg_core::build_view(&memo, b, &nodes),
            differences: diff(a, b),
            versions_between: versions_between(a.version(), b.version()),
        })
    }

    pub fn timeline(&self, memo_id: &MemoId) -> Result<TimelineView, EngineError> {
        let memo = self.load_memo(memo_id)?;
        let nodes = self.load_nodes(memo_id)?;
        let current = find_node(&nodes, memo.current_node_id()).ok_or_else(|| {
            EngineError::not_found(format_args!(
                "node {} (memo={memo_id})",
                memo.current_node_id()
            ))
        })?;
        Ok(build_timeline(&memo, current, &nodes))
    }
}

fn version_of<'a>(
    nodes: &'a [VersionNode],
    memo_id: &MemoId,
    version: u32,
) -> Result<&'a VersionNode, EngineError> {
    find_version(nodes, version)
        .ok_or_else(|| EngineError::not_found(format_args!("version {version} (memo={memo_id})")))
}
