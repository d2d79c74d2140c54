use crate::node::Node;

/// Owns the root and every tier while a tree is being built, and flattens
/// them into the output order once construction is done.
#[derive(Debug)]
pub struct TreeAssembler {
    root: Node,
    tiers: Vec<Vec<Node>>,
}

impl TreeAssembler {
    pub fn new(root: Node, leaves: Vec<Node>) -> Self {
        Self {
            root,
            tiers: vec![leaves],
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Tiers in construction order: leaves first.
    pub fn tiers(&self) -> &[Vec<Node>] {
        &self.tiers
    }

    /// The most recently added tier.
    pub fn current_tier(&self) -> &[Node] {
        self.tiers.last().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn current_tier_mut(&mut self) -> &mut [Node] {
        self.tiers
            .last_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or_default()
    }

    pub fn push_tier(&mut self, tier: Vec<Node>) {
        self.tiers.push(tier);
    }

    /// Flat shape: the root's children are exactly the current tier.
    pub fn adopt_current_tier_into_root(&mut self) {
        let root_id = self.root.guid;
        let mut child_ids = Vec::new();
        for node in self.current_tier_mut() {
            node.parent_id = Some(root_id);
            child_ids.push(node.guid);
        }
        self.root.set_children(child_ids);
    }

    /// Merge the last surviving branch into the root. The survivor's id is
    /// discarded and its children are re-parented onto the root.
    pub fn absorb_into_root(&mut self, survivor: Node) {
        let root = &mut self.root;
        if survivor.has_text() {
            if root.text.is_empty() {
                root.text = survivor.text;
            } else {
                root.text = format!("{}\n{}", root.text, survivor.text);
            }
        }
        if !survivor.summary.is_empty() {
            root.summary = survivor.summary;
        }
        root.keywords.extend(survivor.keywords);
        if survivor.sparse_weights.is_some() {
            root.sparse_weights = survivor.sparse_weights;
        }
        root.set_children(survivor.child_ids);

        let root_id = root.guid;
        for node in self.current_tier_mut() {
            node.parent_id = Some(root_id);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.tiers.iter().map(Vec::len).sum::<usize>()
    }

    /// Every node, root first.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        std::iter::once(&mut self.root).chain(self.tiers.iter_mut().flatten())
    }

    /// Root first, then each tier in the order it was built.
    pub fn finish(self) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(self.node_count());
        nodes.push(self.root);
        nodes.extend(self.tiers.into_iter().flatten());
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Level;
    use crate::sequencer::ChunkSequencer;
    use pretty_assertions::assert_eq;

    fn sequencer() -> ChunkSequencer {
        ChunkSequencer::new("doc", "doc.txt", 2, 0.5)
    }

    #[test]
    fn flat_adoption_links_root_and_leaves() {
        let sequencer = sequencer();
        let leaves = sequencer.sequence(&["a", "b", "c"], Level::Leaf);
        let leaf_ids: Vec<_> = leaves.iter().map(|n| n.guid).collect();
        let mut assembler = TreeAssembler::new(sequencer.root(), leaves);

        assembler.adopt_current_tier_into_root();
        let root_id = assembler.root().guid;
        let nodes = assembler.finish();

        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].level, Level::Root);
        assert_eq!(nodes[0].child_ids, leaf_ids);
        assert_eq!(nodes[0].first_child_id, Some(leaf_ids[0]));
        assert_eq!(nodes[0].last_child_id, Some(leaf_ids[2]));
        assert!(nodes[1..].iter().all(|n| n.parent_id == Some(root_id)));
    }

    #[test]
    fn absorb_moves_survivor_content_into_root() {
        let sequencer = sequencer();
        let leaves = sequencer.sequence(&["a", "b"], Level::Leaf);
        let leaf_ids: Vec<_> = leaves.iter().map(|n| n.guid).collect();
        let mut assembler = TreeAssembler::new(sequencer.root(), leaves);

        let mut survivor = sequencer.sequence(&["a\nb"], Level::Internal).remove(0);
        survivor.summary = "ab".to_string();
        survivor.keywords = vec!["k".to_string()];
        survivor.set_children(leaf_ids.clone());
        for leaf in assembler.current_tier_mut() {
            leaf.parent_id = Some(survivor.guid);
        }

        assembler.absorb_into_root(survivor);
        let root = assembler.root().clone();
        assert_eq!(root.level, Level::Root);
        assert_eq!(root.text, "a\nb");
        assert_eq!(root.summary, "ab");
        assert_eq!(root.keywords, vec!["k".to_string()]);
        assert_eq!(root.child_ids, leaf_ids);
        assert!(assembler
            .current_tier()
            .iter()
            .all(|n| n.parent_id == Some(root.guid)));
        assert_eq!(assembler.node_count(), 3);
    }

    #[test]
    fn finish_orders_root_then_tiers() {
        let sequencer = sequencer();
        let leaves = sequencer.sequence(&["a", "b", "c"], Level::Leaf);
        let mut assembler = TreeAssembler::new(sequencer.root(), leaves);
        assembler.push_tier(sequencer.sequence(&["ab", "c"], Level::Internal));

        let levels: Vec<Level> = assembler.finish().iter().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![
                Level::Root,
                Level::Leaf,
                Level::Leaf,
                Level::Leaf,
                Level::Internal,
                Level::Internal,
            ]
        );
    }
}
