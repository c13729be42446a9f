#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form key/value payload carried by every version.
pub type Metadata = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoStatus {
    Draft,
    Sent,
    InProgress,
    Completed,
    Archived,
}

impl MemoStatus {
    pub const ALL: [MemoStatus; 5] = [
        MemoStatus::Draft,
        MemoStatus::Sent,
        MemoStatus::InProgress,
        MemoStatus::Completed,
        MemoStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MemoStatus::Draft => "DRAFT",
            MemoStatus::Sent => "SENT",
            MemoStatus::InProgress => "IN_PROGRESS",
            MemoStatus::Completed => "COMPLETED",
            MemoStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for MemoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a version exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Created,
    Updated,
    Assigned,
    Commented,
    StatusChanged,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::Created,
        ActionType::Updated,
        ActionType::Assigned,
        ActionType::Commented,
        ActionType::StatusChanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Created => "CREATED",
            ActionType::Updated => "UPDATED",
            ActionType::Assigned => "ASSIGNED",
            ActionType::Commented => "COMMENTED",
            ActionType::StatusChanged => "STATUS_CHANGED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shallow merge: keys from `overlay` replace same-named keys in `base`.
pub fn merge_metadata(base: &Metadata, overlay: Option<&Metadata>) -> Metadata {
    let mut out = base.clone();
    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_and_action_names_round_trip() {
        for status in MemoStatus::ALL {
            assert_eq!(MemoStatus::parse(status.as_str()), Some(status));
        }
        for action in ActionType::ALL {
            assert_eq!(ActionType::parse(action.as_str()), Some(action));
        }
        assert_eq!(MemoStatus::parse(" in_progress "), Some(MemoStatus::InProgress));
        assert_eq!(ActionType::parse("merged"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActionType::StatusChanged).unwrap(),
            "\"STATUS_CHANGED\""
        );
        assert_eq!(
            serde_json::from_str::<MemoStatus>("\"IN_PROGRESS\"").unwrap(),
            MemoStatus::InProgress
        );
    }

    #[test]
    fn merge_is_shallow_and_overlay_wins() {
        let base = json!({"priority": "low", "tags": ["a"], "nested": {"x": 1}});
        let overlay = json!({"priority": "high", "nested": {"y": 2}});
        let merged = merge_metadata(
            base.as_object().unwrap(),
            Some(overlay.as_object().unwrap()),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"priority": "high", "tags": ["a"], "nested": {"y": 2}})
        );
    }

    #[test]
    fn merge_without_overlay_copies_base() {
        let base = json!({"k": 1});
        let merged = merge_metadata(base.as_object().unwrap(), None);
        assert_eq!(Value::Object(merged), base);
    }
}
