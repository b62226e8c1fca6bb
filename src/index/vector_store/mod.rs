#[cfg(test)]
mod tests;

use super::{ChunkMetadata, EmbeddingRecord};
use crate::SopError;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";

/// Persisted vector index over procedure chunks, backed by LanceDB.
///
/// An index is consistent only within one ingestion run: [`VectorStore::create`]
/// drops whatever was there before, and there is no incremental update or
/// deletion. Once opened the store is read-only.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub metadata: ChunkMetadata,
    /// Cosine similarity, `1.0 - distance` (higher is better)
    pub similarity: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Create a fresh index at `index_dir`, replacing any existing table.
    #[inline]
    pub async fn create(index_dir: &Path, dimension: usize) -> Result<Self, SopError> {
        let connection = connect(index_dir).await?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: dimension,
        };

        store.drop_table_if_exists().await?;

        store
            .connection
            .create_empty_table(&store.table_name, store.schema())
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to create table: {e}")))?;

        info!(
            "Created empty index at {} ({} dimensions)",
            index_dir.display(),
            dimension
        );
        Ok(store)
    }

    /// Open an existing index for querying. Missing index directories or
    /// tables are fatal for the caller.
    #[inline]
    pub async fn open(index_dir: &Path, dimension: usize) -> Result<Self, SopError> {
        if !index_dir.is_dir() {
            return Err(SopError::Index(format!(
                "no index found at {}; run `sop-finder ingest` first",
                index_dir.display()
            )));
        }

        let connection = connect(index_dir).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to list tables: {e}")))?;

        if !table_names.contains(&TABLE_NAME.to_string()) {
            return Err(SopError::Index(format!(
                "index at {} has no chunk table; run `sop-finder ingest` first",
                index_dir.display()
            )));
        }

        debug!("Opened index at {}", index_dir.display());

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: dimension,
        })
    }

    /// Store a batch of embedding records.
    #[inline]
    pub async fn store_batch(&self, records: Vec<EmbeddingRecord>) -> Result<(), SopError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        for record in &records {
            if record.vector.len() != self.vector_dimension {
                return Err(SopError::Index(format!(
                    "vector dimension mismatch: expected {}, got {}",
                    self.vector_dimension,
                    record.vector.len()
                )));
            }
        }

        debug!("Storing batch of {} embeddings", records.len());

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to open table: {e}")))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to insert embeddings: {e}")))?;

        Ok(())
    }

    /// Search for the `limit` nearest chunks by cosine distance.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, SopError> {
        debug!("Searching index with limit {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to open table: {e}")))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| SopError::Index(format!("Failed to create vector search: {e}")))?
            .distance_type(DistanceType::Cosine)
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to execute search: {e}")))?;

        self.parse_search_results_stream(results).await
    }

    /// Total number of chunks in the index.
    #[inline]
    pub async fn count(&self) -> Result<u64, SopError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to open table: {e}")))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| SopError::Index(format!("Failed to count rows: {e}")))?;

        Ok(count as u64)
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("source_file", DataType::Utf8, false),
            Field::new("page_number", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, SopError> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut source_files = Vec::with_capacity(len);
        let mut page_numbers = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            source_files.push(record.metadata.source_file.as_str());
            page_numbers.push(record.metadata.page_number);
            chunk_indices.push(record.metadata.chunk_index);
            contents.push(record.metadata.content.as_str());
            created_ats.push(record.metadata.created_at.as_str());
        }

        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| SopError::Index(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(source_files)),
            Arc::new(UInt32Array::from(page_numbers)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| SopError::Index(format!("Failed to create record batch: {e}")))
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, SopError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| SopError::Index(format!("Failed to read result stream: {e}")))?
        {
            let parsed_batch = parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    async fn drop_table_if_exists(&self) -> Result<(), SopError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SopError::Index(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing chunk table before rebuild");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| SopError::Index(format!("Failed to drop table: {e}")))?;
        }

        Ok(())
    }
}

async fn connect(index_dir: &Path) -> Result<Connection, SopError> {
    std::fs::create_dir_all(index_dir)
        .map_err(|e| SopError::Index(format!("Failed to create index directory: {e}")))?;

    let uri = format!("file://{}", index_dir.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| SopError::Index(format!("Failed to connect to index: {e}")))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, SopError> {
    let num_rows = batch.num_rows();
    let mut search_results = Vec::with_capacity(num_rows);

    let source_files = string_column(batch, "source_file")?;
    let page_numbers = u32_column(batch, "page_number")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;
    let contents = string_column(batch, "content")?;
    let created_ats = string_column(batch, "created_at")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let metadata = ChunkMetadata {
            source_file: source_files.value(row).to_string(),
            page_number: page_numbers.value(row),
            chunk_index: chunk_indices.value(row),
            content: contents.value(row).to_string(),
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        search_results.push(SearchResult {
            metadata,
            similarity: 1.0 - distance,
            distance,
        });
    }

    Ok(search_results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, SopError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SopError::Index(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| SopError::Index(format!("Invalid {name} column type")))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, SopError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SopError::Index(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| SopError::Index(format!("Invalid {name} column type")))
}
