#![allow(dead_code)]

use async_trait::async_trait;
use doctree_inference::{EmbedOutput, InferenceError, InferenceService};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Embed(Vec<String>),
    Summarize(String),
    Keywords(String, usize),
}

/// Inference backend for tests: records every call, answers
/// deterministically, sleeps a text-dependent time so completion order is
/// shuffled, and fails on texts containing `fail_on`.
pub struct ScriptedService {
    pub dimension: usize,
    /// Summary = the first `summary_words` words of the input.
    pub summary_words: usize,
    pub fail_on: Option<String>,
    pub fail_embeddings: bool,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            summary_words: 1,
            fail_on: None,
            fail_embeddings: false,
            min_latency_ms: 0,
            max_latency_ms: 5,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summary_words(mut self, words: usize) -> Self {
        self.summary_words = words;
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn with_latency(mut self, max_latency_ms: u64) -> Self {
        self.max_latency_ms = max_latency_ms;
        self
    }

    pub fn with_min_latency(mut self, min_latency_ms: u64) -> Self {
        self.min_latency_ms = min_latency_ms;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn summarize_inputs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Summarize(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn keyword_inputs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Keywords(text, _) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn embed_batches(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Embed(texts) => Some(texts),
                _ => None,
            })
            .collect()
    }

    /// Every text the service was asked about.
    pub fn all_inputs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .flat_map(|call| match call {
                Call::Embed(texts) => texts,
                Call::Summarize(text) | Call::Keywords(text, _) => vec![text],
            })
            .collect()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        vec![1.0 + (text.len() % 7) as f32; self.dimension]
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self, text: &str) -> Result<(), InferenceError> {
        let jitter = fnv(text) % (self.max_latency_ms + 1);
        let delay = self.min_latency_ms + jitter;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match &self.fail_on {
            Some(needle) if text.contains(needle.as_str()) => {
                Err(InferenceError::Other(format!("scripted failure on {text:?}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl InferenceService for ScriptedService {
    async fn embed(&self, texts: &[String], _sparse: bool) -> doctree_inference::Result<EmbedOutput> {
        self.record(Call::Embed(texts.to_vec()));
        if self.fail_embeddings {
            return Err(InferenceError::Other("embedding backend down".into()));
        }
        Ok(EmbedOutput {
            dense: texts.iter().map(|t| self.vector_for(t)).collect(),
            sparse: None,
        })
    }

    async fn summarize(&self, text: &str) -> doctree_inference::Result<String> {
        self.record(Call::Summarize(text.to_string()));
        self.pause(text).await?;
        Ok(text
            .split_whitespace()
            .take(self.summary_words)
            .collect::<Vec<_>>()
            .join(" "))
    }

    async fn extract_keywords(
        &self,
        text: &str,
        max_keywords: usize,
    ) -> doctree_inference::Result<Vec<String>> {
        self.record(Call::Keywords(text.to_string(), max_keywords));
        self.pause(text).await?;
        Ok(text
            .split_whitespace()
            .take(max_keywords)
            .map(str::to_lowercase)
            .collect())
    }
}

fn fnv(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
