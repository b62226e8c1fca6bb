use super::*;
use crate::document::{Document, PageContent};
use std::path::PathBuf;

fn small_config() -> ChunkingConfig {
    ChunkingConfig {
        max_chars: 40,
        overlap: 10,
    }
}

fn create_test_document() -> Document {
    Document {
        path: PathBuf::from("manuals/pole-climbing.pdf"),
        pages: vec![
            PageContent {
                page_number: 1,
                text: "Inspect the pole base for rot or cracking before climbing. ".repeat(8),
            },
            PageContent {
                page_number: 2,
                text: "Short closing page.".to_string(),
            },
        ],
    }
}

#[test]
fn short_page_is_a_single_chunk() {
    let config = ChunkingConfig::default();
    let chunks = chunk_page("Wear insulated gloves.", &config);

    assert_eq!(chunks, vec!["Wear insulated gloves.".to_string()]);
}

#[test]
fn page_shorter_than_overlap_is_a_single_chunk() {
    let config = ChunkingConfig {
        max_chars: 100,
        overlap: 50,
    };
    let chunks = chunk_page("Tiny.", &config);

    assert_eq!(chunks.len(), 1);
}

#[test]
fn whitespace_page_produces_no_chunks() {
    let config = ChunkingConfig::default();
    assert!(chunk_page("   \n\t ", &config).is_empty());
}

#[test]
fn chunks_respect_max_length() {
    let config = small_config();
    let text = "abcdefghij".repeat(25);
    let chunks = chunk_page(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= config.max_chars);
    }
}

#[test]
fn consecutive_chunks_share_the_overlap() {
    let config = small_config();
    let text = "0123456789".repeat(20);
    let chunks = chunk_page(&text, &config);

    for pair in chunks.windows(2) {
        let prev_tail: String = pair[0]
            .chars()
            .skip(pair[0].chars().count() - config.overlap)
            .collect();
        let next_head: String = pair[1].chars().take(config.overlap).collect();
        assert_eq!(prev_tail, next_head);
    }
}

#[test]
fn chunking_is_lossless_up_to_overlap() {
    let config = small_config();
    let text = "Lockout tagout must be applied before any maintenance work begins. ".repeat(12);
    let chunks = chunk_page(&text, &config);

    assert_eq!(reassemble_page(&chunks, &config), text);
}

#[test]
fn multibyte_text_splits_at_char_boundaries() {
    let config = ChunkingConfig {
        max_chars: 120,
        overlap: 20,
    };
    let text = "Tensão nominal de operação: 13,8 kV — seção 4.2. ".repeat(10);
    let chunks = chunk_page(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= config.max_chars);
    }
    assert_eq!(reassemble_page(&chunks, &config), text);
}

#[test]
fn document_chunks_carry_source_metadata() {
    let config = ChunkingConfig {
        max_chars: 100,
        overlap: 20,
    };
    let document = create_test_document();
    let chunks = chunk_document(&document, &config);

    assert!(chunks.len() > 2);
    assert!(chunks.iter().all(|c| c.source_file == "pole-climbing.pdf"));
    assert!(chunks.iter().any(|c| c.page_number == 1));
    assert!(chunks.iter().any(|c| c.page_number == 2));

    // Chunk indices are dense and ordered across the whole document
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
    }
}

#[test]
fn rechunking_the_same_document_is_identical() {
    let config = ChunkingConfig::default();
    let document = create_test_document();

    let first = chunk_document(&document, &config);
    let second = chunk_document(&document, &config);

    assert_eq!(first, second);
}
