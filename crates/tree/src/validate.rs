//! Structural checks over a flattened node list.
//!
//! Detects:
//! - missing or duplicate roots
//! - parents that do not resolve, or disagree with their children
//! - stale first/last child pointers
//! - broken sibling chains
//! - cycles in the parent chain

use crate::error::{Result, TreeError};
use crate::node::{Level, Node};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Shape of a tree plus every invariant violation found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeReport {
    pub node_count: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    /// Number of levels below the root (0 for a root-only tree).
    pub depth: usize,
    /// Node count per distance from the root; index 0 is the root.
    pub tier_sizes: Vec<usize>,
    pub issues: Vec<String>,
}

impl TreeReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// `Err(Invariant)` carrying the first issue, if any.
    pub fn into_result(self) -> Result<Self> {
        match self.issues.first() {
            Some(issue) => Err(TreeError::invariant(issue.clone())),
            None => Ok(self),
        }
    }
}

pub fn validate_tree(nodes: &[Node]) -> TreeReport {
    let mut report = TreeReport {
        node_count: nodes.len(),
        ..TreeReport::default()
    };

    let mut by_id: HashMap<Uuid, &Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if by_id.insert(node.guid, node).is_some() {
            report.issues.push(format!("duplicate guid {}", node.guid));
        }
        match node.level {
            Level::Leaf => report.leaf_count += 1,
            Level::Internal => report.internal_count += 1,
            Level::Root => {}
        }
    }

    let roots: Vec<&Node> = nodes.iter().filter(|n| n.level == Level::Root).collect();
    if roots.len() != 1 {
        report
            .issues
            .push(format!("expected exactly one root, found {}", roots.len()));
    }

    for node in nodes {
        check_parent(node, &by_id, &mut report.issues);
        check_children(node, &by_id, &mut report.issues);
        check_siblings(node, &by_id, &mut report.issues);
    }

    for node in nodes {
        match distance_to_root(node, &by_id) {
            Some(distance) => {
                if report.tier_sizes.len() <= distance {
                    report.tier_sizes.resize(distance + 1, 0);
                }
                report.tier_sizes[distance] += 1;
            }
            None => report
                .issues
                .push(format!("node {} does not reach the root", node.guid)),
        }
    }
    report.depth = report.tier_sizes.len().saturating_sub(1);

    report
}

fn check_parent(node: &Node, by_id: &HashMap<Uuid, &Node>, issues: &mut Vec<String>) {
    match (node.level, node.parent_id) {
        (Level::Root, Some(parent)) => {
            issues.push(format!("root {} has parent {parent}", node.guid));
        }
        (Level::Root, None) => {}
        (_, None) => issues.push(format!("node {} has no parent", node.guid)),
        (_, Some(parent_id)) => match by_id.get(&parent_id) {
            None => issues.push(format!(
                "node {} points to missing parent {parent_id}",
                node.guid
            )),
            Some(parent) if !parent.child_ids.contains(&node.guid) => issues.push(format!(
                "parent {parent_id} does not list child {}",
                node.guid
            )),
            Some(_) => {}
        },
    }
}

fn check_children(node: &Node, by_id: &HashMap<Uuid, &Node>, issues: &mut Vec<String>) {
    if node.first_child_id != node.child_ids.first().copied()
        || node.last_child_id != node.child_ids.last().copied()
    {
        issues.push(format!("node {} has stale first/last child", node.guid));
    }
    if node.level == Level::Leaf && !node.child_ids.is_empty() {
        issues.push(format!("leaf {} has children", node.guid));
    }

    let mut seen = HashSet::new();
    for child_id in &node.child_ids {
        if !seen.insert(child_id) {
            issues.push(format!("node {} lists child {child_id} twice", node.guid));
        }
        match by_id.get(child_id) {
            None => issues.push(format!(
                "node {} lists missing child {child_id}",
                node.guid
            )),
            Some(child) if child.parent_id != Some(node.guid) => issues.push(format!(
                "child {child_id} of {} points elsewhere",
                node.guid
            )),
            Some(_) => {}
        }
    }
}

fn check_siblings(node: &Node, by_id: &HashMap<Uuid, &Node>, issues: &mut Vec<String>) {
    if let Some(next_id) = node.next_sibling_id {
        match by_id.get(&next_id) {
            Some(next) if next.previous_sibling_id == Some(node.guid) && next.level == node.level => {}
            Some(_) => issues.push(format!(
                "sibling link {} -> {next_id} is not mirrored",
                node.guid
            )),
            None => issues.push(format!(
                "node {} points to missing next sibling {next_id}",
                node.guid
            )),
        }
    }
    if let Some(previous_id) = node.previous_sibling_id {
        match by_id.get(&previous_id) {
            Some(previous) if previous.next_sibling_id == Some(node.guid) => {}
            Some(_) => issues.push(format!(
                "sibling link {previous_id} <- {} is not mirrored",
                node.guid
            )),
            None => issues.push(format!(
                "node {} points to missing previous sibling {previous_id}",
                node.guid
            )),
        }
    }
}

/// Steps from `node` to the root, or `None` on a cycle or dangling parent.
fn distance_to_root(node: &Node, by_id: &HashMap<Uuid, &Node>) -> Option<usize> {
    let mut current = node;
    for steps in 0..=by_id.len() {
        if current.level == Level::Root {
            return Some(steps);
        }
        current = *by_id.get(&current.parent_id?)?;
    }
    None
}
