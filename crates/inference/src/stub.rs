use crate::error::Result;
use crate::service::{EmbedOutput, InferenceService, SparseWeights};
use async_trait::async_trait;
use std::collections::HashMap;

const SPARSE_VOCAB_SIZE: u64 = 30_522;

/// Deterministic offline backend.
///
/// Embeddings are seeded from a hash of the text, summaries keep the leading
/// words, keywords are the most frequent words. Identical input always yields
/// identical output, so trees built with it are reproducible.
#[derive(Debug, Clone)]
pub struct StubInference {
    dimension: usize,
    summary_words: usize,
}

impl StubInference {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            summary_words: 12,
        }
    }

    #[must_use]
    pub const fn with_summary_words(mut self, words: usize) -> Self {
        self.summary_words = words;
        self
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// The vector `embed` returns for `text`.
    #[must_use]
    pub fn embedding_for(&self, text: &str) -> Vec<f32> {
        stub_embed(text, self.dimension)
    }

    fn summary_for(&self, text: &str) -> String {
        text.split_whitespace()
            .take(self.summary_words)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl InferenceService for StubInference {
    async fn embed(&self, texts: &[String], sparse: bool) -> Result<EmbedOutput> {
        let dense = texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect();
        let sparse = sparse.then(|| texts.iter().map(|text| sparse_weights(text)).collect());
        Ok(EmbedOutput { dense, sparse })
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(self.summary_for(text))
    }

    async fn extract_keywords(&self, text: &str, max_keywords: usize) -> Result<Vec<String>> {
        Ok(top_words(text, max_keywords))
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
}

fn top_words(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in words(text).enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    // Most frequent first; ties keep first-occurrence order.
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

fn sparse_weights(text: &str) -> SparseWeights {
    let mut weights = SparseWeights::new();
    let mut total = 0usize;
    for word in words(text) {
        let id = (fnv1a_64(word.as_bytes()) % SPARSE_VOCAB_SIZE) as u32;
        *weights.entry(id).or_insert(0.0) += 1.0;
        total += 1;
    }
    if total > 0 {
        for weight in weights.values_mut() {
            *weight /= total as f32;
        }
    }
    weights
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
