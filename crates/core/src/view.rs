#![forbid(unsafe_code)]

use crate::graph::{children_of, find_node};
use crate::ids::{MemoId, NodeId};
use crate::model::{ActionType, MemoStatus, Metadata};
use crate::node::{Memo, VersionNode};
use serde::{Deserialize, Serialize};

/// A version enriched with its position in the memo's graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoView {
    pub id: NodeId,
    pub memo_id: MemoId,
    pub version: u32,
    pub title: String,
    pub content: String,
    pub status: MemoStatus,
    pub sender_id: String,
    pub recipient_id: String,
    pub assigned_to_id: Option<String>,
    pub metadata: Metadata,

    pub is_current_version: bool,
    pub total_versions: usize,
    pub created_at_ms: i64,
    pub last_modified_at_ms: i64,

    pub next_version_id: Option<NodeId>,
    pub previous_version_id: Option<NodeId>,
    pub can_go_forward: bool,
    pub can_go_backward: bool,

    pub action_type: ActionType,
    pub action_by_id: String,
    pub action_comment: Option<String>,
    pub action_timestamp_ms: i64,
}

/// Combines `node` with navigation context derived from `nodes`, the full node
/// set of `memo`. Never fails: missing neighbours simply leave the links empty.
pub fn build_view(memo: &Memo, node: &VersionNode, nodes: &[VersionNode]) -> MemoView {
    let next_version_id = children_of(nodes, node.id())
        .first()
        .map(|child| child.id().clone());
    let previous_version_id = node
        .primary_parent()
        .and_then(|parent| find_node(nodes, parent))
        .map(|parent| parent.id().clone());

    MemoView {
        id: node.id().clone(),
        memo_id: node.memo_id().clone(),
        version: node.version(),
        title: node.title().to_string(),
        content: node.content().to_string(),
        status: node.status(),
        sender_id: node.sender_id().to_string(),
        recipient_id: node.recipient_id().to_string(),
        assigned_to_id: node.assigned_to_id().map(str::to_string),
        metadata: node.metadata().clone(),
        is_current_version: node.id() == memo.current_node_id(),
        total_versions: nodes.len(),
        created_at_ms: memo.created_at_ms(),
        last_modified_at_ms: memo.updated_at_ms(),
        can_go_forward: next_version_id.is_some(),
        can_go_backward: previous_version_id.is_some(),
        next_version_id,
        previous_version_id,
        action_type: node.action_type(),
        action_by_id: node.action_by_id().to_string(),
        action_comment: node.action_comment().map(str::to_string),
        action_timestamp_ms: node.created_at_ms(),
    }
}

/// Summary row for listing memos, taken from the current version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoListItem {
    pub id: MemoId,
    pub current_version: u32,
    pub total_versions: usize,
    pub title: String,
    pub status: MemoStatus,
    pub sender_id: String,
    pub recipient_id: String,
    pub assigned_to_id: Option<String>,
    pub created_at_ms: i64,
    pub last_modified_at_ms: i64,
}

pub fn build_list_item(memo: &Memo, current: &VersionNode, total_versions: usize) -> MemoListItem {
    MemoListItem {
        id: memo.id().clone(),
        current_version: current.version(),
        total_versions,
        title: current.title().to_string(),
        status: current.status(),
        sender_id: current.sender_id().to_string(),
        recipient_id: current.recipient_id().to_string(),
        assigned_to_id: current.assigned_to_id().map(str::to_string),
        created_at_ms: memo.created_at_ms(),
        last_modified_at_ms: memo.updated_at_ms(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{MutationIntent, NewMemo, UpdateMemo};

    fn chain() -> (Memo, Vec<VersionNode>) {
        let root = VersionNode::root(
            NodeId::try_new("n1").unwrap(),
            MemoId::try_new("m1").unwrap(),
            NewMemo::new("Q3 report", "draft body", "alice", "bob"),
            100,
        );
        let second = MutationIntent::Update(UpdateMemo {
            title: Some("Q3 report v2".to_string()),
            ..UpdateMemo::default()
        })
        .apply(&root, NodeId::try_new("n2").unwrap(), "alice", 200)
        .unwrap();
        let memo = Memo::new(&root).advanced_to(second.id().clone(), 200);
        (memo, vec![root, second])
    }

    #[test]
    fn root_view_can_only_go_forward() {
        let (memo, nodes) = chain();
        let view = build_view(&memo, &nodes[0], &nodes);
        assert!(!view.is_current_version);
        assert_eq!(view.total_versions, 2);
        assert!(view.can_go_forward);
        assert!(!view.can_go_backward);
        assert_eq!(view.next_version_id.as_ref(), Some(nodes[1].id()));
        assert_eq!(view.previous_version_id, None);
        assert_eq!(view.created_at_ms, 100);
        assert_eq!(view.last_modified_at_ms, 200);
    }

    #[test]
    fn current_view_can_only_go_back() {
        let (memo, nodes) = chain();
        let view = build_view(&memo, &nodes[1], &nodes);
        assert!(view.is_current_version);
        assert!(!view.can_go_forward);
        assert!(view.can_go_backward);
        assert_eq!(view.previous_version_id.as_ref(), Some(nodes[0].id()));
        assert_eq!(view.title, "Q3 report v2");
        assert_eq!(view.action_type, ActionType::Updated);
        assert_eq!(view.action_timestamp_ms, 200);
    }

    #[test]
    fn previous_link_requires_resolvable_parent() {
        let (memo, nodes) = chain();
        let only_second = vec![nodes[1].clone()];
        let view = build_view(&memo, &only_second[0], &only_second);
        assert!(!view.can_go_backward);
        assert_eq!(view.previous_version_id, None);
    }

    #[test]
    fn list_item_reflects_current_version() {
        let (memo, nodes) = chain();
        let item = build_list_item(&memo, &nodes[1], nodes.len());
        assert_eq!(item.current_version, 2);
        assert_eq!(item.total_versions, 2);
        assert_eq!(item.title, "Q3 report v2");
        assert_eq!(item.status, MemoStatus::Sent);
    }
}
