#![forbid(unsafe_code)]

//! Domain model and pure graph logic for versioned memos.
//!
//! Every memo is a rooted DAG of immutable [`VersionNode`]s plus a [`Memo`]
//! control record pointing at the root and at the current version. Nothing in
//! this crate performs I/O; persistence and write serialization live in
//! `mg_storage`.

pub mod diff;
pub mod graph;
pub mod ids;
pub mod model;
pub mod mutation;
pub mod node;
pub mod time;
pub mod timeline;
pub mod view;

pub use diff::{Differences, FieldChange, FieldChanges, MemoComparison, diff, versions_between};
pub use graph::{InvariantViolation, RevisionPath, RevisionPathEntry};
pub use ids::{IdError, MemoId, NodeId};
pub use model::{ActionType, MemoStatus, Metadata, merge_metadata};
pub use mutation::{AssignMemo, MutationIntent, NewMemo, UpdateMemo};
pub use node::{Memo, NodeError, NodeFields, NodeParts, VersionNode};
pub use timeline::{TimelineEntry, TimelineView, build_timeline};
pub use view::{MemoListItem, MemoView, build_list_item, build_view};
