use crate::error::{Result, StoreError};
use doctree_core::{Level, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Every stored node of one document, in upsert order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document_id: String,
    pub document_name: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub document_name: String,
    pub node_count: usize,
}

/// Outcome of one upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertStats {
    pub inserted: usize,
    pub replaced: usize,
}

/// Outcome of swapping a whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceStats {
    pub written: usize,
    /// Nodes of the previous version, zero for a new document.
    pub discarded: usize,
}

impl StoredDocument {
    /// Start a record for the document the nodes belong to. All nodes must
    /// carry the same document id.
    pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
        let first = nodes
            .first()
            .ok_or_else(|| StoreError::invalid("no nodes to store"))?;
        if let Some(stray) = nodes.iter().find(|n| n.document_id != first.document_id) {
            return Err(StoreError::invalid(format!(
                "node {} belongs to document {:?}, expected {:?}",
                stray.guid, stray.document_id, first.document_id
            )));
        }
        Ok(Self {
            document_id: first.document_id.clone(),
            document_name: first.document_name.clone(),
            nodes: Vec::with_capacity(nodes.len()),
        })
    }

    /// Replace nodes with a matching guid in place and append the rest.
    pub fn upsert(&mut self, nodes: &[Node]) -> UpsertStats {
        let mut positions: HashMap<Uuid, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.guid, idx))
            .collect();
        let mut stats = UpsertStats::default();
        for node in nodes {
            match positions.get(&node.guid) {
                Some(&idx) => {
                    self.nodes[idx] = node.clone();
                    stats.replaced += 1;
                }
                None => {
                    positions.insert(node.guid, self.nodes.len());
                    self.nodes.push(node.clone());
                    stats.inserted += 1;
                }
            }
        }
        if let Some(node) = nodes.first() {
            self.document_name = node.document_name.clone();
        }
        stats
    }

    /// Drop every stored node and keep only `nodes`.
    pub fn replace(&mut self, nodes: &[Node]) -> ReplaceStats {
        let discarded = self.nodes.len();
        self.nodes.clear();
        self.upsert(nodes);
        ReplaceStats {
            written: self.nodes.len(),
            discarded,
        }
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.level == Level::Root)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            document_id: self.document_id.clone(),
            document_name: self.document_name.clone(),
            node_count: self.nodes.len(),
        }
    }
}
