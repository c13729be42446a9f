#![forbid(unsafe_code)]

//! Graph queries over the node set of a single memo.
//!
//! Every function takes the memo's nodes as a slice (the arena) and resolves
//! parent references by id. Callers are expected to pass nodes of one memo only.

mod invariants;
mod path;

pub use invariants::*;
pub use path::*;

use crate::ids::NodeId;
use crate::model::ActionType;
use crate::node::VersionNode;

/// Nodes listing `parent_id` among their parents, ascending by version.
pub fn children_of<'a>(nodes: &'a [VersionNode], parent_id: &NodeId) -> Vec<&'a VersionNode> {
    let mut out = nodes
        .iter()
        .filter(|node| node.has_parent(parent_id))
        .collect::<Vec<_>>();
    out.sort_by(|a, b| sibling_order(a).cmp(&sibling_order(b)));
    out
}

/// Siblings order by version, then creation time, then id.
pub(crate) fn sibling_order(node: &VersionNode) -> (u32, i64, &NodeId) {
    (node.version(), node.created_at_ms(), node.id())
}

pub fn branch_count(nodes: &[VersionNode], node_id: &NodeId) -> usize {
    nodes.iter().filter(|node| node.has_parent(node_id)).count()
}

pub fn find_node<'a>(nodes: &'a [VersionNode], node_id: &NodeId) -> Option<&'a VersionNode> {
    nodes.iter().find(|node| node.id() == node_id)
}

pub fn find_version(nodes: &[VersionNode], version: u32) -> Option<&VersionNode> {
    nodes.iter().find(|node| node.version() == version)
}

/// The latest node created at or before `timestamp_ms`; ties go to the higher version.
pub fn latest_at_or_before(nodes: &[VersionNode], timestamp_ms: i64) -> Option<&VersionNode> {
    nodes
        .iter()
        .filter(|node| node.created_at_ms() <= timestamp_ms)
        .max_by_key(|node| (node.created_at_ms(), node.version()))
}

pub fn latest_with_action(nodes: &[VersionNode], action: ActionType) -> Option<&VersionNode> {
    nodes
        .iter()
        .filter(|node| node.action_type() == action)
        .max_by_key(|node| node.version())
}
