#![forbid(unsafe_code)]

use crate::ids::{MemoId, NodeId};
use crate::model::{ActionType, MemoStatus, Metadata};
use crate::mutation::NewMemo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One immutable snapshot of a memo plus the action that produced it.
///
/// Parents are referenced by id only; the store owning the node set resolves
/// them. `parent_node_ids[0]` is the primary parent used for linear navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeParts")]
pub struct VersionNode {
    id: NodeId,
    memo_id: MemoId,
    version: u32,
    title: String,
    content: String,
    status: MemoStatus,
    sender_id: String,
    recipient_id: String,
    assigned_to_id: Option<String>,
    action_type: ActionType,
    action_by_id: String,
    action_comment: Option<String>,
    parent_node_ids: Vec<NodeId>,
    metadata: Metadata,
    created_at_ms: i64,
}

/// Raw field set used to build or rehydrate a [`VersionNode`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeParts {
    pub id: NodeId,
    pub memo_id: MemoId,
    pub version: u32,
    pub title: String,
    pub content: String,
    pub status: MemoStatus,
    pub sender_id: String,
    pub recipient_id: String,
    pub assigned_to_id: Option<String>,
    pub action_type: ActionType,
    pub action_by_id: String,
    pub action_comment: Option<String>,
    pub parent_node_ids: Vec<NodeId>,
    pub metadata: Metadata,
    pub created_at_ms: i64,
}

/// Payload a successor node resolves against its primary parent.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeFields {
    pub title: String,
    pub content: String,
    pub status: MemoStatus,
    pub sender_id: String,
    pub recipient_id: String,
    pub assigned_to_id: Option<String>,
    pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    ZeroVersion,
    RootVersionMismatch,
    SelfParent,
    DuplicateParent,
    NoParents,
    ParentFromOtherMemo,
}

impl NodeError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroVersion => "version must be positive",
            Self::RootVersionMismatch => "a node without parents must have version 1",
            Self::SelfParent => "node must not list itself as a parent",
            Self::DuplicateParent => "parent ids must be unique",
            Self::NoParents => "successor requires at least one parent",
            Self::ParentFromOtherMemo => "parent belongs to another memo",
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for NodeError {}

impl TryFrom<NodeParts> for VersionNode {
    type Error = NodeError;

    fn try_from(parts: NodeParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

impl VersionNode {
    pub fn from_parts(parts: NodeParts) -> Result<Self, NodeError> {
        if parts.version == 0 {
            return Err(NodeError::ZeroVersion);
        }
        if parts.parent_node_ids.is_empty() && parts.version != 1 {
            return Err(NodeError::RootVersionMismatch);
        }
        if parts.parent_node_ids.contains(&parts.id) {
            return Err(NodeError::SelfParent);
        }
        for (index, parent) in parts.parent_node_ids.iter().enumerate() {
            if parts.parent_node_ids[..index].contains(parent) {
                return Err(NodeError::DuplicateParent);
            }
        }

        Ok(Self {
            id: parts.id,
            memo_id: parts.memo_id,
            version: parts.version,
            title: parts.title,
            content: parts.content,
            status: parts.status,
            sender_id: parts.sender_id,
            recipient_id: parts.recipient_id,
            assigned_to_id: parts.assigned_to_id,
            action_type: parts.action_type,
            action_by_id: parts.action_by_id,
            action_comment: parts.action_comment,
            parent_node_ids: parts.parent_node_ids,
            metadata: parts.metadata,
            created_at_ms: parts.created_at_ms,
        })
    }

    /// Version 1 of a fresh memo: status SENT, action CREATED, authored by the sender.
    pub fn root(id: NodeId, memo_id: MemoId, draft: NewMemo, created_at_ms: i64) -> Self {
        Self {
            id,
            memo_id,
            version: 1,
            title: draft.title,
            content: draft.content,
            status: MemoStatus::Sent,
            action_by_id: draft.sender_id.clone(),
            sender_id: draft.sender_id,
            recipient_id: draft.recipient_id,
            assigned_to_id: None,
            action_type: ActionType::Created,
            action_comment: None,
            parent_node_ids: Vec::new(),
            metadata: draft.metadata.unwrap_or_default(),
            created_at_ms,
        }
    }

    /// Builds a node on top of `parents`; the version is one past the highest parent.
    pub fn successor(
        id: NodeId,
        parents: &[&VersionNode],
        fields: NodeFields,
        action_type: ActionType,
        action_by_id: String,
        action_comment: Option<String>,
        created_at_ms: i64,
    ) -> Result<Self, NodeError> {
        let Some(primary) = parents.first() else {
            return Err(NodeError::NoParents);
        };
        if parents.iter().any(|p| p.memo_id != primary.memo_id) {
            return Err(NodeError::ParentFromOtherMemo);
        }
        let version = parents
            .iter()
            .map(|p| p.version)
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        Self::from_parts(NodeParts {
            id,
            memo_id: primary.memo_id.clone(),
            version,
            title: fields.title,
            content: fields.content,
            status: fields.status,
            sender_id: fields.sender_id,
            recipient_id: fields.recipient_id,
            assigned_to_id: fields.assigned_to_id,
            action_type,
            action_by_id,
            action_comment,
            parent_node_ids: parents.iter().map(|p| p.id.clone()).collect(),
            metadata: fields.metadata,
            created_at_ms,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn memo_id(&self) -> &MemoId {
        &self.memo_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> MemoStatus {
        self.status
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn assigned_to_id(&self) -> Option<&str> {
        self.assigned_to_id.as_deref()
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn action_by_id(&self) -> &str {
        &self.action_by_id
    }

    pub fn action_comment(&self) -> Option<&str> {
        self.action_comment.as_deref()
    }

    pub fn parent_node_ids(&self) -> &[NodeId] {
        &self.parent_node_ids
    }

    pub fn primary_parent(&self) -> Option<&NodeId> {
        self.parent_node_ids.first()
    }

    pub fn is_root(&self) -> bool {
        self.parent_node_ids.is_empty()
    }

    pub fn has_parent(&self, id: &NodeId) -> bool {
        self.parent_node_ids.contains(id)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// Snapshot of the inheritable payload, the starting point for a successor.
    pub fn fields(&self) -> NodeFields {
        NodeFields {
            title: self.title.clone(),
            content: self.content.clone(),
            status: self.status,
            sender_id: self.sender_id.clone(),
            recipient_id: self.recipient_id.clone(),
            assigned_to_id: self.assigned_to_id.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id
            || self.recipient_id == user_id
            || self.assigned_to_id.as_deref() == Some(user_id)
    }
}

/// Control record of a memo. Only the current pointer and `updated_at_ms` move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    id: MemoId,
    root_node_id: NodeId,
    current_node_id: NodeId,
    created_at_ms: i64,
    updated_at_ms: i64,
}

impl Memo {
    pub fn new(root: &VersionNode) -> Self {
        Self {
            id: root.memo_id.clone(),
            root_node_id: root.id.clone(),
            current_node_id: root.id.clone(),
            created_at_ms: root.created_at_ms,
            updated_at_ms: root.created_at_ms,
        }
    }

    pub fn from_parts(
        id: MemoId,
        root_node_id: NodeId,
        current_node_id: NodeId,
        created_at_ms: i64,
        updated_at_ms: i64,
    ) -> Self {
        Self {
            id,
            root_node_id,
            current_node_id,
            created_at_ms,
            updated_at_ms,
        }
    }

    /// Copy of this memo with the pointer moved to `node_id`.
    pub fn advanced_to(&self, node_id: NodeId, updated_at_ms: i64) -> Self {
        Self {
            id: self.id.clone(),
            root_node_id: self.root_node_id.clone(),
            current_node_id: node_id,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms.max(updated_at_ms),
        }
    }

    pub fn id(&self) -> &MemoId {
        &self.id
    }

    pub fn root_node_id(&self) -> &NodeId {
        &self.root_node_id
    }

    pub fn current_node_id(&self) -> &NodeId {
        &self.current_node_id
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn updated_at_ms(&self) -> i64 {
        self.updated_at_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> VersionNode {
        VersionNode::root(
            NodeId::try_new("n1").unwrap(),
            MemoId::try_new("m1").unwrap(),
            NewMemo::new("Q3 report", "draft body", "alice", "bob"),
            100,
        )
    }

    #[test]
    fn root_defaults() {
        let node = root();
        assert_eq!(node.version(), 1);
        assert_eq!(node.status(), MemoStatus::Sent);
        assert_eq!(node.action_type(), ActionType::Created);
        assert_eq!(node.action_by_id(), "alice");
        assert!(node.is_root());
        assert!(node.primary_parent().is_none());
    }

    #[test]
    fn successor_takes_max_parent_version_plus_one() {
        let first = root();
        let second = VersionNode::successor(
            NodeId::try_new("n2").unwrap(),
            &[&first],
            first.fields(),
            ActionType::Updated,
            "alice".to_string(),
            None,
            200,
        )
        .unwrap();
        let third = VersionNode::successor(
            NodeId::try_new("n3").unwrap(),
            &[&first, &second],
            second.fields(),
            ActionType::Updated,
            "bob".to_string(),
            None,
            300,
        )
        .unwrap();
        assert_eq!(second.version(), 2);
        assert_eq!(third.version(), 3);
        assert_eq!(third.primary_parent(), Some(first.id()));
        assert_eq!(third.memo_id(), first.memo_id());
    }

    #[test]
    fn successor_requires_parents() {
        let err = VersionNode::successor(
            NodeId::try_new("n2").unwrap(),
            &[],
            root().fields(),
            ActionType::Updated,
            "alice".to_string(),
            None,
            0,
        )
        .unwrap_err();
        assert_eq!(err, NodeError::NoParents);
    }

    #[test]
    fn from_parts_rejects_malformed_nodes() {
        let node = root();
        let mut parts = NodeParts {
            id: node.id().clone(),
            memo_id: node.memo_id().clone(),
            version: 2,
            title: String::new(),
            content: String::new(),
            status: MemoStatus::Sent,
            sender_id: "a".to_string(),
            recipient_id: "b".to_string(),
            assigned_to_id: None,
            action_type: ActionType::Updated,
            action_by_id: "a".to_string(),
            action_comment: None,
            parent_node_ids: Vec::new(),
            metadata: Metadata::new(),
            created_at_ms: 0,
        };
        assert_eq!(
            VersionNode::from_parts(parts.clone()).unwrap_err(),
            NodeError::RootVersionMismatch
        );
        parts.parent_node_ids = vec![node.id().clone()];
        assert_eq!(
            VersionNode::from_parts(parts.clone()).unwrap_err(),
            NodeError::SelfParent
        );
        let other = NodeId::try_new("n0").unwrap();
        parts.parent_node_ids = vec![other.clone(), other];
        assert_eq!(
            VersionNode::from_parts(parts.clone()).unwrap_err(),
            NodeError::DuplicateParent
        );
        parts.version = 0;
        assert_eq!(
            VersionNode::from_parts(parts).unwrap_err(),
            NodeError::ZeroVersion
        );
    }

    #[test]
    fn memo_pointer_moves_but_root_stays() {
        let node = root();
        let memo = Memo::new(&node);
        assert_eq!(memo.root_node_id(), memo.current_node_id());
        let moved = memo.advanced_to(NodeId::try_new("n9").unwrap(), 500);
        assert_eq!(moved.root_node_id(), node.id());
        assert_eq!(moved.current_node_id().as_str(), "n9");
        assert_eq!(moved.created_at_ms(), 100);
        assert_eq!(moved.updated_at_ms(), 500);
    }

    #[test]
    fn serde_keeps_valid_nodes_and_refuses_broken_ones() {
        let node = root();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(serde_json::from_value::<VersionNode>(json.clone()).unwrap(), node);

        let mut zero = json.clone();
        zero["version"] = serde_json::json!(0);
        let err = serde_json::from_value::<VersionNode>(zero).unwrap_err();
        assert!(err.to_string().contains("version must be positive"), "{err}");

        let mut looped = json.clone();
        looped["version"] = serde_json::json!(2);
        looped["parent_node_ids"] = serde_json::json!(["n1"]);
        let err = serde_json::from_value::<VersionNode>(looped).unwrap_err();
        assert!(err.to_string().contains("itself as a parent"), "{err}");

        let mut doubled = json;
        doubled["version"] = serde_json::json!(2);
        doubled["parent_node_ids"] = serde_json::json!(["n0", "n0"]);
        let err = serde_json::from_value::<VersionNode>(doubled).unwrap_err();
        assert!(err.to_string().contains("parent ids must be unique"), "{err}");
    }
}
