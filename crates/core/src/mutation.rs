#![forbid(unsafe_code)]

use crate::ids::NodeId;
use crate::model::{ActionType, MemoStatus, Metadata, merge_metadata};
use crate::node::{NodeError, VersionNode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewMemo {
    pub title: String,
    pub content: String,
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl NewMemo {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMemo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignMemo {
    pub assigned_to_id: String,
    pub assigned_by_id: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// What a write does to the current version. Each variant fixes the recorded
/// action type and which fields it may override; everything else is inherited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationIntent {
    Update(UpdateMemo),
    Assign {
        assigned_to_id: String,
        comment: Option<String>,
    },
    ChangeStatus {
        status: MemoStatus,
    },
    Comment {
        comment: String,
    },
}

impl MutationIntent {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Update(_) => ActionType::Updated,
            Self::Assign { .. } => ActionType::Assigned,
            Self::ChangeStatus { .. } => ActionType::StatusChanged,
            Self::Comment { .. } => ActionType::Commented,
        }
    }

    /// Resolves this intent against `parent` into the next immutable node.
    pub fn apply(
        &self,
        parent: &VersionNode,
        id: NodeId,
        actor_id: &str,
        created_at_ms: i64,
    ) -> Result<VersionNode, NodeError> {
        let mut fields = parent.fields();
        let mut comment = None;

        match self {
            Self::Update(update) => {
                if let Some(title) = &update.title {
                    fields.title = title.clone();
                }
                if let Some(content) = &update.content {
                    fields.content = content.clone();
                }
                fields.metadata = merge_metadata(parent.metadata(), update.metadata.as_ref());
            }
            Self::Assign {
                assigned_to_id,
                comment: assign_comment,
            } => {
                fields.status = MemoStatus::InProgress;
                fields.assigned_to_id = Some(assigned_to_id.clone());
                comment = assign_comment.clone();
            }
            Self::ChangeStatus { status } => {
                fields.status = *status;
            }
            Self::Comment { comment: text } => {
                comment = Some(text.clone());
            }
        }

        VersionNode::successor(
            id,
            &[parent],
            fields,
            self.action_type(),
            actor_id.to_string(),
            comment,
            created_at_ms,
        )
    }
}

impl From<UpdateMemo> for MutationIntent {
    fn from(value: UpdateMemo) -> Self {
        Self::Update(value)
    }
}
