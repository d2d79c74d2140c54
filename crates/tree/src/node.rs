use doctree_inference::SparseWeights;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position of a node in the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Root,
    Internal,
    Leaf,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Internal => "internal",
            Self::Leaf => "leaf",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of a document tree: a chunk, a summary branch, or the root.
///
/// Relationships are stored as ids, never as references, so a finished tree
/// is a flat list the storage backend can index by `guid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub guid: Uuid,
    pub document_id: String,
    pub document_name: String,

    pub text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_weights: Option<SparseWeights>,

    pub level: Level,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub child_ids: Vec<Uuid>,
    #[serde(default)]
    pub first_child_id: Option<Uuid>,
    #[serde(default)]
    pub last_child_id: Option<Uuid>,
    #[serde(default)]
    pub previous_sibling_id: Option<Uuid>,
    #[serde(default)]
    pub next_sibling_id: Option<Uuid>,
}

impl Node {
    /// Fresh node with a new id and a filler embedding.
    pub fn new(
        document_id: impl Into<String>,
        document_name: impl Into<String>,
        text: impl Into<String>,
        level: Level,
        filler: Vec<f32>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            document_id: document_id.into(),
            document_name: document_name.into(),
            text: text.into(),
            summary: String::new(),
            keywords: Vec::new(),
            embedding: filler,
            sparse_weights: None,
            level,
            parent_id: None,
            child_ids: Vec::new(),
            first_child_id: None,
            last_child_id: None,
            previous_sibling_id: None,
            next_sibling_id: None,
        }
    }

    /// Replace the ordered child list and keep first/last child in sync.
    pub fn set_children(&mut self, child_ids: Vec<Uuid>) {
        self.first_child_id = child_ids.first().copied();
        self.last_child_id = child_ids.last().copied();
        self.child_ids = child_ids;
    }

    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Constant non-zero vector for nodes that never get a real embedding.
pub fn filler_embedding(dimensions: usize, value: f32) -> Vec<f32> {
    vec![value; dimensions]
}

/// Chain `previous_sibling_id` / `next_sibling_id` along slice order.
pub fn link_siblings(nodes: &mut [Node]) {
    for idx in 1..nodes.len() {
        let previous = nodes[idx - 1].guid;
        let current = nodes[idx].guid;
        nodes[idx - 1].next_sibling_id = Some(current);
        nodes[idx].previous_sibling_id = Some(previous);
    }
}
