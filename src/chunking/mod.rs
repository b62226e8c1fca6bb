#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;

/// A chunk of extracted procedure text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// File name of the source PDF
    pub source_file: String,
    /// 1-based page the text was extracted from
    pub page_number: u32,
    /// Index of this chunk within the document
    pub chunk_index: usize,
}

/// Configuration for character-window chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub max_chars: usize,
    /// Characters shared between consecutive chunks of the same page
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 150,
        }
    }
}

/// Chunk every page of a document into overlapping character windows.
///
/// Chunk indices run across the whole document so ordering survives into
/// the index.
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let source_file = document.file_name();
    let mut chunks = Vec::new();

    for page in &document.pages {
        for content in chunk_page(&page.text, config) {
            chunks.push(Chunk {
                content,
                source_file: source_file.clone(),
                page_number: page.page_number,
                chunk_index: chunks.len(),
            });
        }
    }

    debug!(
        "Chunked '{}' ({} pages) into {} chunks",
        source_file,
        document.pages.len(),
        chunks.len()
    );

    chunks
}

/// Split one page of text into windows of at most `max_chars` characters,
/// each sharing exactly `overlap` characters with its predecessor.
///
/// Windows are cut at `char` boundaries. A page that fits in one window
/// (including pages shorter than the overlap) yields a single chunk;
/// whitespace-only pages yield none. Invariant: `overlap < max_chars`,
/// enforced by config validation.
#[inline]
pub fn chunk_page(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.max_chars {
        return vec![text.to_string()];
    }

    let step = config.max_chars - config.overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = usize::min(start + config.max_chars, chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Reassemble a page from its chunk sequence by dropping each chunk's
/// leading overlap. Inverse of [`chunk_page`]; used to check that chunking
/// loses no text.
#[inline]
pub fn reassemble_page(chunks: &[String], config: &ChunkingConfig) -> String {
    let mut text = String::new();

    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(config.overlap));
        }
    }

    text
}
