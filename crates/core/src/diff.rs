#![forbid(unsafe_code)]

use crate::model::MemoStatus;
use crate::node::VersionNode;
use crate::view::MemoView;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub from: T,
    pub to: T,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChanges {
    pub title: Option<FieldChange<String>>,
    pub content: Option<FieldChange<String>>,
    pub status: Option<FieldChange<MemoStatus>>,
    pub assigned_to: Option<FieldChange<Option<String>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differences {
    pub title_changed: bool,
    pub content_changed: bool,
    pub status_changed: bool,
    pub assignment_changed: bool,
    pub metadata_changed: bool,
    pub fields: FieldChanges,
}

impl Differences {
    pub fn any_changed(&self) -> bool {
        self.title_changed
            || self.content_changed
            || self.status_changed
            || self.assignment_changed
            || self.metadata_changed
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoComparison {
    pub version_a: MemoView,
    pub version_b: MemoView,
    pub differences: Differences,
    pub versions_between: u32,
}

fn change<T: PartialEq + Clone>(from: &T, to: &T) -> Option<FieldChange<T>> {
    (from != to).then(|| FieldChange {
        from: from.clone(),
        to: to.clone(),
    })
}

/// Field-level differences going from `a` to `b`. Metadata is compared
/// structurally and only reported as a flag.
pub fn diff(a: &VersionNode, b: &VersionNode) -> Differences {
    let title = change(&a.title().to_string(), &b.title().to_string());
    let content = change(&a.content().to_string(), &b.content().to_string());
    let status = change(&a.status(), &b.status());
    let assigned_to = change(
        &a.assigned_to_id().map(str::to_string),
        &b.assigned_to_id().map(str::to_string),
    );

    Differences {
        title_changed: title.is_some(),
        content_changed: content.is_some(),
        status_changed: status.is_some(),
        assignment_changed: assigned_to.is_some(),
        metadata_changed: a.metadata() != b.metadata(),
        fields: FieldChanges {
            title,
            content,
            status,
            assigned_to,
        },
    }
}

/// Number of versions strictly between two version numbers.
pub fn versions_between(version_a: u32, version_b: u32) -> u32 {
    version_a.abs_diff(version_b).saturating_sub(1)
}
