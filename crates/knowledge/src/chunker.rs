//! Recursive character chunker.
//!
//! Splits page text into passages of at most `chunk_size` characters.
//! Breaks are taken at paragraph, line, then word boundaries before falling
//! back to single characters, and each passage after the first starts with
//! up to `chunk_overlap` characters carried over from the end of the previous
//! one.

use lawguide_common::{Document, LawGuideError, Passage, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Boundaries tried in order, coarsest first. The empty separator splits
/// between characters and always succeeds.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum passage length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive passages.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 750,
            chunk_overlap: 80,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(LawGuideError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(LawGuideError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks every document, keeping document order and source metadata.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Passage> {
        let passages: Vec<Passage> = documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| Passage::new(text, doc.source.clone(), index))
            })
            .collect();

        debug!(
            "Split {} documents into {} passages (size {}, overlap {})",
            documents.len(),
            passages.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );
        passages
    }

    /// Splits a single text. Text that already fits is returned unchanged as
    /// the only chunk; blank text yields nothing.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.config.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len() - 1);
        let separator = separators[position];
        let finer = &separators[position + 1..];

        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for split in splits {
            if char_len(split) < self.config.chunk_size {
                pending.push(split);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }

            if finer.is_empty() {
                let piece = split.trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(split, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }

        chunks
    }

    /// Greedily packs splits into windows no longer than `chunk_size`,
    /// seeding each new window with trailing splits worth at most
    /// `chunk_overlap` characters.
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &split in splits {
            let len = char_len(split);

            if !window.is_empty() && total + len + joiner_len(&window, sep_len) > size {
                push_joined(&mut chunks, &window, separator);

                // Drop leading splits until the remainder fits the overlap
                // budget and leaves room for the incoming split.
                while total > overlap || (total > 0 && total + len + joiner_len(&window, sep_len) > size) {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + joiner_len(&window, sep_len);
                }
            }

            total += joiner_len(&window, sep_len) + len;
            window.push_back(split);
        }

        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn joiner_len(window: &VecDeque<&str>, sep_len: usize) -> usize {
    if window.is_empty() {
        0
    } else {
        sep_len
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
