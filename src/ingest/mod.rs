// Ingestion pipeline
// One-shot batch process: discover PDFs, extract, chunk, embed, persist


use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunking::{Chunk, chunk_document};
use crate::config::Config;
use crate::document::{Document, discover_pdfs, load_document};
use crate::index::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::openai::OpenAiClient;
use crate::{Result, SopError};

/// Records written to the index per storage call
const STORE_BATCH_SIZE: usize = 64;

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub embeddings: usize,
    pub elapsed: Duration,
}

/// One-shot index builder. Any embedding or storage failure aborts the
/// whole run; a partially written index is not rolled back and should be
/// rebuilt by the operator.
pub struct Ingestor {
    config: Config,
    client: OpenAiClient,
}

impl Ingestor {
    #[inline]
    pub fn new(config: Config, client: OpenAiClient) -> Self {
        Self { config, client }
    }

    /// Build the vector index from every PDF under `data_dir`, replacing
    /// any existing index at the configured location.
    #[inline]
    pub async fn run(&self, data_dir: &Path) -> Result<IngestStats> {
        let started = Instant::now();

        let paths = discover_pdfs(data_dir)?;
        if paths.is_empty() {
            return Err(SopError::Document(format!(
                "no PDF files found under {}",
                data_dir.display()
            )));
        }

        info!("Ingesting {} PDF files from {}", paths.len(), data_dir.display());

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(load_document(path)?);
        }

        let pages: usize = documents.iter().map(Document::page_count).sum();
        let chunks = collect_chunks(&documents, &self.config);

        if chunks.is_empty() {
            return Err(SopError::Document(
                "no text could be extracted from the discovered PDFs".to_string(),
            ));
        }

        debug!("Prepared {} chunks from {} pages", chunks.len(), pages);

        let store = VectorStore::create(
            &self.config.storage.index_dir,
            self.client.embedding_dimension(),
        )
        .await?;

        let embeddings = self.embed_and_store(&store, &chunks).await?;

        Ok(IngestStats {
            documents: documents.len(),
            pages,
            chunks: chunks.len(),
            embeddings,
            elapsed: started.elapsed(),
        })
    }

    async fn embed_and_store(&self, store: &VectorStore, chunks: &[Chunk]) -> Result<usize> {
        let progress = embedding_progress_bar(chunks.len() as u64);
        let created_at = Utc::now().to_rfc3339();
        let mut embeddings = 0;

        for batch in chunks.chunks(STORE_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = self
                .client
                .embed_batch(&texts)
                .map_err(|e| SopError::Embedding(format!("{e:#}")))?;

            let records = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    metadata: ChunkMetadata {
                        source_file: chunk.source_file.clone(),
                        page_number: chunk.page_number,
                        chunk_index: chunk.chunk_index as u32,
                        content: chunk.content.clone(),
                        created_at: created_at.clone(),
                    },
                })
                .collect();

            store.store_batch(records).await?;

            embeddings += batch.len();
            progress.inc(batch.len() as u64);
        }

        progress.finish_and_clear();
        info!("Stored {} embeddings", embeddings);
        Ok(embeddings)
    }
}

/// Chunk every document, keeping discovery order.
fn collect_chunks(documents: &[Document], config: &Config) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(chunk_document(document, &config.chunking));
    }
    chunks
}

fn embedding_progress_bar(len: u64) -> ProgressBar {
    if console::user_attended() {
        ProgressBar::new(len).with_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] Embedding chunks")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    }
}
