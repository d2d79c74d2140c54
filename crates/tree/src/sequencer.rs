use crate::node::{filler_embedding, link_siblings, Level, Node};

/// Turns an ordered list of texts into ordered, sibling-linked nodes of one
/// document.
#[derive(Debug, Clone)]
pub struct ChunkSequencer {
    document_id: String,
    document_name: String,
    dimensions: usize,
    filler_value: f32,
}

impl ChunkSequencer {
    pub fn new(
        document_id: impl Into<String>,
        document_name: impl Into<String>,
        dimensions: usize,
        filler_value: f32,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            document_name: document_name.into(),
            dimensions,
            filler_value,
        }
    }

    /// Empty-text root carrying the filler embedding.
    pub fn root(&self) -> Node {
        self.node(String::new(), Level::Root)
    }

    /// One node per text, in input order, linked left to right.
    pub fn sequence<S: AsRef<str>>(&self, texts: &[S], level: Level) -> Vec<Node> {
        let mut nodes: Vec<Node> = texts
            .iter()
            .map(|text| self.node(text.as_ref().to_string(), level))
            .collect();
        link_siblings(&mut nodes);
        nodes
    }

    fn node(&self, text: String, level: Level) -> Node {
        Node::new(
            self.document_id.clone(),
            self.document_name.clone(),
            text,
            level,
            filler_embedding(self.dimensions, self.filler_value),
        )
    }
}
