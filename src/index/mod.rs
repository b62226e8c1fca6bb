// Vector index module
// Wraps the LanceDB table that persists chunk embeddings and metadata

pub mod vector_store;

pub use vector_store::{SearchResult, VectorStore};

use serde::{Deserialize, Serialize};

/// Embedding record stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this entry
    pub id: String,
    /// The embedding vector for the chunk text
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File name of the source PDF
    pub source_file: String,
    /// 1-based page the chunk was extracted from
    pub page_number: u32,
    /// Index of the chunk within its document (for ordering)
    pub chunk_index: u32,
    /// The chunk text
    pub content: String,
    /// Timestamp of the ingestion run that produced this entry
    pub created_at: String,
}
