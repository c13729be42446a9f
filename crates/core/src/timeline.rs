#![forbid(unsafe_code)]

use crate::graph::branch_count;
use crate::ids::{MemoId, NodeId};
use crate::model::ActionType;
use crate::node::{Memo, VersionNode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub node_id: NodeId,
    pub version: u32,
    pub action_type: ActionType,
    pub action_by_id: String,
    pub action_comment: Option<String>,
    pub timestamp_ms: i64,
    pub is_current_version: bool,
    pub has_branches: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineView {
    pub memo_id: MemoId,
    pub total_versions: usize,
    pub current_version: u32,
    pub timeline: Vec<TimelineEntry>,
}

/// Ordered history of `memo`. `nodes` must be the memo's full node set and
/// `current` the node its pointer resolves to. Branching is recomputed on
/// every call.
pub fn build_timeline(memo: &Memo, current: &VersionNode, nodes: &[VersionNode]) -> TimelineView {
    let mut ordered = nodes.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|node| (node.version(), node.created_at_ms()));

    let timeline = ordered
        .into_iter()
        .map(|node| TimelineEntry {
            node_id: node.id().clone(),
            version: node.version(),
            action_type: node.action_type(),
            action_by_id: node.action_by_id().to_string(),
            action_comment: node.action_comment().map(str::to_string),
            timestamp_ms: node.created_at_ms(),
            is_current_version: node.id() == memo.current_node_id(),
            has_branches: branch_count(nodes, node.id()) > 1,
        })
        .collect::<Vec<_>>();

    TimelineView {
        memo_id: memo.id().clone(),
        total_versions: timeline.len(),
        current_version: current.version(),
        timeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{MutationIntent, NewMemo};

    #[test]
    fn timeline_flags_current_and_branch_points() {
        let root = VersionNode::root(
            NodeId::try_new("n1").unwrap(),
            MemoId::try_new("m1").unwrap(),
            NewMemo::new("t", "c", "alice", "bob"),
            10,
        );
        let comment = MutationIntent::Comment {
            comment: "first".to_string(),
        };
        let left = comment
            .apply(&root, NodeId::try_new("n2").unwrap(), "bob", 20)
            .unwrap();
        let right = comment
            .apply(&root, NodeId::try_new("n3").unwrap(), "carol", 21)
            .unwrap();
        let memo = Memo::new(&root).advanced_to(left.id().clone(), 20);
        let nodes = vec![right.clone(), left.clone(), root.clone()];

        let view = build_timeline(&memo, &left, &nodes);
        assert_eq!(view.total_versions, 3);
        assert_eq!(view.current_version, 2);
        let order = view
            .timeline
            .iter()
            .map(|e| e.node_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["n1", "n2", "n3"]);
        assert!(view.timeline[0].has_branches);
        assert!(!view.timeline[1].has_branches);
        assert!(view.timeline[1].is_current_version);
        assert!(!view.timeline[2].is_current_version);
        assert_eq!(view.timeline[2].action_comment.as_deref(), Some("first"));
        assert_eq!(view.timeline[2].action_type, ActionType::Commented);
    }
}
