use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Sparse lexical weights keyed by vocabulary id.
pub type SparseWeights = BTreeMap<u32, f32>;

/// Result of one (possibly batched) embedding request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedOutput {
    /// One dense vector per input, in input order.
    pub dense: Vec<Vec<f32>>,
    /// One weight map per input when sparse weights were requested and the
    /// backend supports them.
    pub sparse: Option<Vec<SparseWeights>>,
}

/// LLM-backed capabilities consumed by the tree builder.
///
/// Implementations must accept batched embedding calls and return results in
/// input order.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn embed(&self, texts: &[String], sparse: bool) -> Result<EmbedOutput>;

    async fn summarize(&self, text: &str) -> Result<String>;

    async fn extract_keywords(&self, text: &str, max_keywords: usize) -> Result<Vec<String>>;
}

/// Parse a comma-separated keyword answer into at most `max_keywords` entries.
pub fn parse_keywords(raw: &str, max_keywords: usize) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|keyword| keyword.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|keyword| !keyword.is_empty())
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}
