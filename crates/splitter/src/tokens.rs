use crate::error::{Result, SplitterError};
use std::path::Path;
use tokenizers::Tokenizer;

/// Measures text length in model tokens.
///
/// Branch budgets and chunk sizes are expressed in tokens of the embedding /
/// chat model, not in characters, so every size decision goes through one of
/// these.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Rough estimate of 4 bytes per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() / 4).max(1)
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Exact counts from a HuggingFace `tokenizer.json` (e.g. an OpenAI-compatible
/// cl100k export).
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }
        let tokenizer = Tokenizer::from_file(path).map_err(|err| {
            SplitterError::tokenizer(format!(
                "failed to load tokenizer {}: {err}",
                path.display()
            ))
        })?;
        log::debug!("Loaded tokenizer from {}", path.display());
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(err) => {
                log::warn!("Tokenizer failed ({err}); falling back to byte estimate");
                HeuristicTokenCounter.count(text)
            }
        }
    }
}
