use crate::config::SplitterConfig;
use crate::error::{Result, SplitterError};
use crate::tokens::TokenCounter;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Splits plain text into ordered, token-budgeted chunks.
///
/// Chunks never cut through a word. A single word that alone exceeds
/// `chunk_size` becomes its own chunk.
pub struct TextSplitter {
    config: SplitterConfig,
    counter: Arc<dyn TokenCounter>,
}

/// Byte span of one word-bound segment plus its token cost.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    tokens: usize,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig, counter: Arc<dyn TokenCounter>) -> Result<Self> {
        config.validate().map_err(SplitterError::invalid_config)?;
        Ok(Self { config, counter })
    }

    #[must_use]
    pub const fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces = self.pieces(text);
        if pieces.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut tokens = 0;

        for idx in 0..pieces.len() {
            let cost = pieces[idx].tokens;
            if tokens + cost > size && start < idx {
                push_slice(&mut chunks, text, &pieces[start..idx]);

                // Carry trailing pieces into the next chunk, but always move
                // past the previous start so the loop makes progress.
                let mut next_start = idx;
                let mut carried = 0;
                while next_start > start + 1 && carried + pieces[next_start - 1].tokens <= overlap {
                    next_start -= 1;
                    carried += pieces[next_start].tokens;
                }
                start = next_start;
                tokens = carried;

                while start < idx && tokens + cost > size {
                    tokens -= pieces[start].tokens;
                    start += 1;
                }
            }
            tokens += cost;
        }
        push_slice(&mut chunks, text, &pieces[start..]);

        log::debug!(
            "Split {} bytes into {} chunks (chunk_size={}, overlap={})",
            text.len(),
            chunks.len(),
            size,
            overlap
        );
        chunks
    }

    fn pieces(&self, text: &str) -> Vec<Piece> {
        text.split_word_bound_indices()
            .filter(|(_, segment)| !segment.trim().is_empty())
            .map(|(start, segment)| Piece {
                start,
                end: start + segment.len(),
                tokens: self.counter.count(segment).max(1),
            })
            .collect()
    }
}

fn push_slice(chunks: &mut Vec<String>, text: &str, pieces: &[Piece]) {
    let (Some(first), Some(last)) = (pieces.first(), pieces.last()) else {
        return;
    };
    let chunk = text[first.start..last.end].trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}
