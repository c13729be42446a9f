#![forbid(unsafe_code)]

use crate::ids::NodeId;
use crate::node::{Memo, VersionNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvariantViolation {
    DuplicateVersion { version: u32 },
    ForeignNode { node_id: NodeId },
    VersionGap { node_id: NodeId, version: u32, expected: u32 },
    MissingRoot { node_id: NodeId },
    RootShape { node_id: NodeId },
    ExtraRoot { node_id: NodeId },
    MissingCurrent { node_id: NodeId },
    DanglingParent { node_id: NodeId, parent_id: NodeId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateVersion { version } => write!(f, "version {version} is not unique"),
            Self::ForeignNode { node_id } => write!(f, "node {node_id} belongs to another memo"),
            Self::VersionGap {
                node_id,
                version,
                expected,
            } => write!(
                f,
                "node {node_id} has version {version}, expected {expected}"
            ),
            Self::MissingRoot { node_id } => write!(f, "root node {node_id} is missing"),
            Self::RootShape { node_id } => {
                write!(f, "root node {node_id} must have version 1 and no parents")
            }
            Self::ExtraRoot { node_id } => {
                write!(f, "node {node_id} has no parents but is not the root")
            }
            Self::MissingCurrent { node_id } => write!(f, "current node {node_id} is missing"),
            Self::DanglingParent { node_id, parent_id } => {
                write!(f, "node {node_id} references missing parent {parent_id}")
            }
        }
    }
}

/// Checks the structural invariants of one memo's graph. An empty result means
/// the graph is well formed.
pub fn check_invariants(memo: &Memo, nodes: &[VersionNode]) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    let by_id = nodes
        .iter()
        .map(|node| (node.id(), node))
        .collect::<HashMap<_, _>>();

    let mut seen_versions = HashSet::new();
    for node in nodes {
        if node.memo_id() != memo.id() {
            out.push(InvariantViolation::ForeignNode {
                node_id: node.id().clone(),
            });
        }
        if !seen_versions.insert(node.version()) {
            out.push(InvariantViolation::DuplicateVersion {
                version: node.version(),
            });
        }
        if node.is_root() {
            if node.id() != memo.root_node_id() {
                out.push(InvariantViolation::ExtraRoot {
                    node_id: node.id().clone(),
                });
            }
            continue;
        }

        let parent_max = node
            .parent_node_ids()
            .iter()
            .filter_map(|parent| by_id.get(parent))
            .map(|parent| parent.version())
            .max();
        if let Some(parent_max) = parent_max {
            let expected = parent_max.saturating_add(1);
            if node.version() != expected {
                out.push(InvariantViolation::VersionGap {
                    node_id: node.id().clone(),
                    version: node.version(),
                    expected,
                });
            }
        }
    }

    match by_id.get(memo.root_node_id()) {
        Some(root) if root.is_root() && root.version() == 1 => {}
        Some(_) => out.push(InvariantViolation::RootShape {
            node_id: memo.root_node_id().clone(),
        }),
        None => out.push(InvariantViolation::MissingRoot {
            node_id: memo.root_node_id().clone(),
        }),
    }

    if !by_id.contains_key(memo.current_node_id()) {
        out.push(InvariantViolation::MissingCurrent {
            node_id: memo.current_node_id().clone(),
        });
        return out;
    }

    // Every ancestor of the current node must resolve.
    let mut stack = vec![memo.current_node_id()];
    let mut visited = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = by_id.get(id) else {
            continue;
        };
        for parent in node.parent_node_ids() {
            if by_id.contains_key(parent) {
                stack.push(parent);
            } else {
                out.push(InvariantViolation::DanglingParent {
                    node_id: node.id().clone(),
                    parent_id: parent.clone(),
                });
            }
        }
    }

    out
}
