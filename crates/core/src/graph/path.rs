#![forbid(unsafe_code)]

use super::sibling_order;
use crate::ids::{MemoId, NodeId};
use crate::model::ActionType;
use crate::node::VersionNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionPathEntry {
    pub node_id: NodeId,
    pub version: u32,
    pub title: String,
    pub action_type: ActionType,
    pub action_by_id: String,
    pub timestamp_ms: i64,
    pub has_multiple_parents: bool,
    pub has_multiple_children: bool,
    pub depth: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionPath {
    pub memo_id: MemoId,
    pub start_version: u32,
    pub end_version: u32,
    pub total_nodes: usize,
    pub path: Vec<RevisionPathEntry>,
}

/// Pre-order depth-first walk of the subtree under `start`, children in
/// ascending version order. Each node appears once, at the depth it was first
/// reached.
pub fn revision_walk<'a>(
    nodes: &'a [VersionNode],
    start: &NodeId,
) -> Vec<(&'a VersionNode, usize)> {
    let by_id = nodes
        .iter()
        .map(|node| (node.id(), node))
        .collect::<HashMap<_, _>>();

    let mut children: HashMap<&NodeId, Vec<&VersionNode>> = HashMap::new();
    for node in nodes {
        for parent in node.parent_node_ids() {
            children.entry(parent).or_default().push(node);
        }
    }
    for list in children.values_mut() {
        list.sort_by(|a, b| sibling_order(a).cmp(&sibling_order(b)));
    }

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = match by_id.get(start) {
        Some(node) => vec![(*node, 0usize)],
        None => Vec::new(),
    };

    while let Some((node, depth)) = stack.pop() {
        if !visited.insert(node.id()) {
            continue;
        }
        out.push((node, depth));
        if let Some(list) = children.get(node.id()) {
            for child in list.iter().rev() {
                if !visited.contains(child.id()) {
                    stack.push((*child, depth + 1));
                }
            }
        }
    }

    out
}

pub fn revision_path<'a>(nodes: &'a [VersionNode], start: &NodeId) -> Vec<&'a VersionNode> {
    revision_walk(nodes, start)
        .into_iter()
        .map(|(node, _)| node)
        .collect()
}

/// Same walk as [`revision_path`], with per-entry branch and depth annotations.
/// Returns `None` when `start` is not among `nodes`.
pub fn annotated_revision_path(nodes: &[VersionNode], start: &NodeId) -> Option<RevisionPath> {
    let walk = revision_walk(nodes, start);
    let (first, _) = walk.first()?;
    let memo_id = first.memo_id().clone();
    let start_version = first.version();

    let mut child_counts: HashMap<&NodeId, usize> = HashMap::new();
    for node in nodes {
        for parent in node.parent_node_ids() {
            *child_counts.entry(parent).or_default() += 1;
        }
    }

    let path = walk
        .iter()
        .map(|(node, depth)| RevisionPathEntry {
            node_id: node.id().clone(),
            version: node.version(),
            title: node.title().to_string(),
            action_type: node.action_type(),
            action_by_id: node.action_by_id().to_string(),
            timestamp_ms: node.created_at_ms(),
            has_multiple_parents: node.parent_node_ids().len() > 1,
            has_multiple_children: child_counts.get(node.id()).copied().unwrap_or(0) > 1,
            depth: *depth,
        })
        .collect::<Vec<_>>();

    let end_version = path
        .iter()
        .map(|entry| entry.version)
        .max()
        .unwrap_or(start_version);

    Some(RevisionPath {
        memo_id,
        start_version,
        end_version,
        total_nodes: path.len(),
        path,
    })
}
