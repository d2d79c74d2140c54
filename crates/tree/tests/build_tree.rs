mod support;

use doctree_core::{
    build_document_tree, build_document_tree_with_cancel, filler_embedding, validate_tree,
    DocumentTreeBuilder, Level, Node, TreeConfig, TreeError,
};
use doctree_inference::{InferenceError, StubInference};
use doctree_splitter::{SplitterConfig, TextSplitter, TokenCounter, WordTokenCounter};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use support::{Call, ScriptedService};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn build(
    chunks: &[&str],
    config: &TreeConfig,
    service: &Arc<ScriptedService>,
) -> doctree_core::Result<Vec<Node>> {
    build_document_tree(
        "guide.md",
        "doc-1",
        chunks,
        config,
        service.clone(),
        Arc::new(WordTokenCounter),
    )
    .await
}

fn by_id(nodes: &[Node]) -> HashMap<Uuid, &Node> {
    nodes.iter().map(|n| (n.guid, n)).collect()
}

fn leaves_in_sibling_order(nodes: &[Node]) -> Vec<&Node> {
    let index = by_id(nodes);
    let mut current = nodes
        .iter()
        .find(|n| n.level == Level::Leaf && n.previous_sibling_id.is_none());
    let mut ordered = Vec::new();
    while let Some(node) = current {
        ordered.push(node);
        current = node.next_sibling_id.and_then(|id| index.get(&id).copied());
    }
    ordered
}

#[tokio::test]
async fn flat_mode_three_chunks() {
    let service = Arc::new(ScriptedService::new(4));
    let config = TreeConfig::flat(4).with_pool_size(2);

    let nodes = build(&["a", "b", "c"], &config, &service).await.unwrap();

    assert_eq!(nodes.len(), 4);
    let root = &nodes[0];
    assert_eq!(root.level, Level::Root);
    assert_eq!(root.text, "");
    assert_eq!(root.embedding, filler_embedding(4, 0.5));

    let leaves = &nodes[1..];
    let leaf_ids: Vec<Uuid> = leaves.iter().map(|n| n.guid).collect();
    assert_eq!(root.child_ids, leaf_ids);
    assert_eq!(root.first_child_id, Some(leaf_ids[0]));
    assert_eq!(root.last_child_id, Some(leaf_ids[2]));

    let texts: Vec<&str> = leaves.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert_eq!(leaves[0].previous_sibling_id, None);
    assert_eq!(leaves[0].next_sibling_id, Some(leaf_ids[1]));
    assert_eq!(leaves[1].previous_sibling_id, Some(leaf_ids[0]));
    assert_eq!(leaves[1].next_sibling_id, Some(leaf_ids[2]));
    assert_eq!(leaves[2].next_sibling_id, None);
    for leaf in leaves {
        assert_eq!(leaf.level, Level::Leaf);
        assert_eq!(leaf.parent_id, Some(root.guid));
        assert_eq!(leaf.embedding, service.vector_for(&leaf.text));
        assert!(leaf.summary.is_empty());
        assert!(leaf.keywords.is_empty());
    }

    assert_eq!(
        service.calls(),
        vec![Call::Embed(vec!["a".into(), "b".into(), "c".into()])]
    );
}

#[tokio::test]
async fn tiny_budget_folds_through_one_internal_tier() {
    let service = Arc::new(ScriptedService::new(4));
    let config = TreeConfig::summarized(4, 2).with_pool_size(3);

    let nodes = build(&["a", "b", "c"], &config, &service).await.unwrap();

    let levels: Vec<Level> = nodes.iter().map(|n| n.level).collect();
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

    let (root, leaves, internal) = (&nodes[0], &nodes[1..4], &nodes[4..6]);
    assert_eq!(internal[0].text, "a\nb");
    assert_eq!(internal[1].text, "c");
    assert_eq!(internal[0].child_ids, vec![leaves[0].guid, leaves[1].guid]);
    assert_eq!(internal[1].child_ids, vec![leaves[2].guid]);
    assert_eq!(internal[0].next_sibling_id, Some(internal[1].guid));
    assert_eq!(leaves[0].parent_id, Some(internal[0].guid));
    assert_eq!(leaves[1].parent_id, Some(internal[0].guid));
    assert_eq!(leaves[2].parent_id, Some(internal[1].guid));

    assert_eq!(root.child_ids, vec![internal[0].guid, internal[1].guid]);
    assert!(internal.iter().all(|n| n.parent_id == Some(root.guid)));
    assert_eq!(root.text, "a\nc");
    assert_eq!(root.summary, "a");
    assert_eq!(root.embedding, service.vector_for("a\nc"));

    let leaf_summaries: Vec<&str> = leaves.iter().map(|n| n.summary.as_str()).collect();
    assert_eq!(leaf_summaries, vec!["a", "b", "c"]);

    let mut summarized = service.summarize_inputs();
    summarized.sort();
    assert_eq!(summarized, vec!["a", "a\nb", "a\nc", "b", "c", "c"]);

    let report = validate_tree(&nodes);
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.tier_sizes, vec![1, 2, 3]);
}

#[tokio::test]
async fn every_build_has_one_root_and_reaches_it() {
    for count in [1usize, 2, 5, 17, 40] {
        let service = Arc::new(ScriptedService::new(3).with_summary_words(2));
        let config = TreeConfig::summarized(3, 5).with_pool_size(4);
        let chunks: Vec<String> = (0..count).map(|i| format!("chunk {i} body text")).collect();
        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();

        let nodes = build(&chunk_refs, &config, &service).await.unwrap();

        let roots = nodes.iter().filter(|n| n.level == Level::Root).count();
        assert_eq!(roots, 1, "chunks={count}");
        let report = validate_tree(&nodes);
        assert!(report.is_valid(), "chunks={count}: {:?}", report.issues);
        assert_eq!(report.leaf_count, count);
        assert_eq!(nodes[0].level, Level::Root);
    }
}

#[tokio::test]
async fn sibling_order_survives_shuffled_completion() {
    let service = Arc::new(
        ScriptedService::new(3)
            .with_summary_words(2)
            .with_latency(15),
    );
    let config = TreeConfig::summarized(3, 6).with_pool_size(8).with_keywords(2);
    let chunks: Vec<String> = (0..60).map(|i| format!("chunk {i}")).collect();
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();

    let nodes = build(&chunk_refs, &config, &service).await.unwrap();

    let ordered = leaves_in_sibling_order(&nodes);
    let texts: Vec<&str> = ordered.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, chunk_refs);
    for leaf in ordered {
        assert_eq!(leaf.summary, leaf.text);
        assert_eq!(leaf.keywords, vec!["chunk".to_string(), leaf.text[6..].to_string()]);
    }

    // Children of every parent appear in chunk order.
    let position: HashMap<Uuid, usize> = nodes
        .iter()
        .filter(|n| n.level == Level::Leaf)
        .enumerate()
        .map(|(idx, n)| (n.guid, idx))
        .collect();
    for parent in nodes.iter().filter(|n| n.level == Level::Internal) {
        let child_positions: Vec<usize> = parent
            .child_ids
            .iter()
            .filter_map(|id| position.get(id).copied())
            .collect();
        assert!(child_positions.windows(2).all(|w| w[0] + 1 == w[1]));
    }
}

#[tokio::test]
async fn branches_stay_within_budget() {
    let service = Arc::new(ScriptedService::new(3).with_summary_words(3));
    let budget = 8;
    let config = TreeConfig::summarized(3, budget).with_pool_size(4);
    let mut chunks: Vec<String> = (0..30)
        .map(|i| vec!["word"; (i * 7) % 9 + 1].join(" "))
        .collect();
    chunks.insert(11, vec!["long"; 50].join(" "));
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();

    let nodes = build(&chunk_refs, &config, &service).await.unwrap();

    let counter = WordTokenCounter;
    for node in nodes.iter().filter(|n| n.level != Level::Leaf) {
        assert!(
            counter.count(&node.text) <= budget || node.child_ids.len() == 1,
            "branch of {} members has {} tokens",
            node.child_ids.len(),
            counter.count(&node.text)
        );
    }
    assert!(validate_tree(&nodes).is_valid());
}

#[tokio::test]
async fn empty_text_never_reaches_the_service() {
    let service = Arc::new(ScriptedService::new(3));
    let config = TreeConfig::summarized(3, 4).with_keywords(2);

    let nodes = build(&["alpha", "", "beta gamma", ""], &config, &service)
        .await
        .unwrap();

    assert!(service.all_inputs().iter().all(|text| !text.is_empty()));
    for node in &nodes {
        assert_eq!(node.embedding.len(), 3);
        if node.has_text() {
            assert_eq!(node.embedding, service.vector_for(&node.text));
        } else {
            assert_eq!(node.embedding, filler_embedding(3, 0.5));
            assert!(node.summary.is_empty());
            assert!(node.keywords.is_empty());
        }
    }
}

#[tokio::test]
async fn all_empty_document_makes_no_calls() {
    let service = Arc::new(ScriptedService::new(3));
    let config = TreeConfig::summarized(3, 4).with_keywords(2);

    let nodes = build(&["", "", ""], &config, &service).await.unwrap();

    assert!(service.calls().is_empty());
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0].child_ids.len(), 3);
    assert!(nodes.iter().all(|n| n.embedding == filler_embedding(3, 0.5)));
}

#[tokio::test]
async fn flat_keywords_cover_every_leaf() {
    let service = Arc::new(ScriptedService::new(3));
    let config = TreeConfig::flat(3).with_keywords(2);

    let nodes = build(&["Red Fox jumps", "Blue Whale"], &config, &service)
        .await
        .unwrap();

    assert_eq!(nodes[0].keywords, Vec::<String>::new());
    assert_eq!(nodes[1].keywords, vec!["red", "fox"]);
    assert_eq!(nodes[2].keywords, vec!["blue", "whale"]);
    assert!(service.summarize_inputs().is_empty());
    let mut keyword_inputs = service.keyword_inputs();
    keyword_inputs.sort();
    assert_eq!(keyword_inputs, vec!["Blue Whale", "Red Fox jumps"]);
}

#[tokio::test]
async fn summary_mode_root_carries_keywords() {
    let service = Arc::new(ScriptedService::new(3));
    let config = TreeConfig::summarized(3, 100).with_keywords(3);

    let nodes = build(&["Alpha one", "Beta two"], &config, &service)
        .await
        .unwrap();

    // Leaves summarize to "Alpha" and "Beta"; one branch folds into the root.
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].text, "Alpha\nBeta");
    assert_eq!(nodes[0].keywords, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn failing_summary_aborts_the_build() {
    let service = Arc::new(ScriptedService::new(3).failing_on("boom"));
    let config = TreeConfig::summarized(3, 10).with_pool_size(2);

    let result = build(&["fine", "boom here", "also fine"], &config, &service).await;

    match result {
        Err(TreeError::Inference(InferenceError::Other(message))) => {
            assert!(message.contains("boom"));
        }
        other => panic!("expected inference failure, got {other:?}"),
    }
    assert!(service.embed_batches().is_empty());
}

#[tokio::test]
async fn failing_keywords_abort_flat_builds() {
    let service = Arc::new(ScriptedService::new(3).failing_on("boom"));
    let config = TreeConfig::flat(3).with_keywords(2);

    let result = build(&["boom"], &config, &service).await;
    assert!(matches!(result, Err(TreeError::Inference(_))));
}

#[tokio::test]
async fn failing_embeddings_abort_the_build() {
    let mut scripted = ScriptedService::new(3);
    scripted.fail_embeddings = true;
    let service = Arc::new(scripted);

    let result = build(&["a"], &TreeConfig::flat(3), &service).await;
    assert!(matches!(result, Err(TreeError::Inference(_))));
}

#[tokio::test]
async fn empty_chunk_list_is_rejected() {
    let service = Arc::new(ScriptedService::new(3));
    let result = build(&[], &TreeConfig::flat(3), &service).await;
    assert!(matches!(result, Err(TreeError::EmptyDocument)));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let service = Arc::new(ScriptedService::new(3));
    let config = TreeConfig::flat(3).with_pool_size(0);
    let result = build(&["a"], &config, &service).await;
    assert!(matches!(result, Err(TreeError::InvalidConfig(_))));
}

#[tokio::test]
async fn non_converging_fold_hits_the_cap() {
    // Summaries repeat their input, so over-budget branches never merge.
    let service = Arc::new(ScriptedService::new(3).with_summary_words(100));
    let config = TreeConfig {
        max_fold_iterations: 3,
        ..TreeConfig::summarized(3, 3)
    };

    let result = build(&["one two", "three four", "five six"], &config, &service).await;
    assert!(matches!(
        result,
        Err(TreeError::FoldLimitExceeded { iterations: 3 })
    ));
}

#[tokio::test]
async fn cancelled_before_start() {
    let service = Arc::new(ScriptedService::new(3));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = build_document_tree_with_cancel(
        "guide.md",
        "doc-1",
        &["a"],
        &TreeConfig::flat(3),
        service.clone(),
        Arc::new(WordTokenCounter),
        cancel,
    )
    .await;

    assert!(matches!(result, Err(TreeError::Cancelled)));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_slow_rounds() {
    let service = Arc::new(ScriptedService::new(3).with_min_latency(20_000));
    let builder = DocumentTreeBuilder::new(
        TreeConfig::summarized(3, 10).with_pool_size(2),
        service,
        Arc::new(WordTokenCounter),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        builder.build_with_cancel("guide.md", "doc-1", &["a", "b", "c", "d"], &cancel),
    )
    .await
    .expect("cancellation must end the build promptly");
    assert!(matches!(result, Err(TreeError::Cancelled)));
}

#[tokio::test]
async fn stub_backend_builds_split_document() {
    let counter: Arc<dyn TokenCounter> = Arc::new(WordTokenCounter);
    let splitter = TextSplitter::new(
        SplitterConfig {
            chunk_size: 20,
            chunk_overlap: 4,
        },
        counter.clone(),
    )
    .unwrap();
    let text: String = (0..300)
        .map(|i| format!("term{} ", i % 37))
        .collect();
    let chunks = splitter.split(&text);
    assert!(chunks.len() > 10);

    let service = Arc::new(StubInference::new(16));
    let config = TreeConfig {
        sparse_embeddings: true,
        ..TreeConfig::summarized(16, 40).with_keywords(4)
    };
    let nodes = build_document_tree("notes.txt", "doc-2", &chunks, &config, service.clone(), counter)
        .await
        .unwrap();

    let report = validate_tree(&nodes);
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.leaf_count, chunks.len());
    assert!(report.depth >= 2);
    for node in nodes.iter().filter(|n| n.has_text()) {
        assert_eq!(node.embedding, service.embedding_for(&node.text));
        assert!(node.sparse_weights.is_some());
        assert!(!node.keywords.is_empty());
    }
    assert!(nodes.iter().all(|n| n.document_id == "doc-2"));
}
