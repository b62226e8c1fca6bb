use super::*;
use tempfile::TempDir;

const DIM: usize = 8;

fn create_test_record(id: u32, source_file: &str) -> EmbeddingRecord {
    // Unit-ish vectors that differ per id so cosine ordering is stable
    let mut vector = vec![1.0_f32; DIM];
    vector[0] += id as f32 * 0.5;

    EmbeddingRecord {
        id: format!("record_{id}"),
        vector,
        metadata: ChunkMetadata {
            source_file: source_file.to_string(),
            page_number: 1,
            chunk_index: id,
            content: format!("Chunk {id}: verify grounding before energizing."),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        },
    }
}

#[tokio::test]
async fn create_then_open() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let store = VectorStore::create(temp_dir.path(), DIM).await;
        assert!(store.is_ok(), "Failed to create store: {:?}", store.err());
    }

    let store = VectorStore::open(temp_dir.path(), DIM)
        .await
        .expect("should open existing index");
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn open_missing_index_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("no-index-here");

    let result = VectorStore::open(&missing, DIM).await;
    assert!(matches!(result, Err(SopError::Index(_))));
}

#[tokio::test]
async fn store_and_count() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), DIM)
        .await
        .expect("should create store");

    let records = vec![
        create_test_record(0, "grounding.pdf"),
        create_test_record(1, "grounding.pdf"),
        create_test_record(2, "switching.pdf"),
    ];

    store
        .store_batch(records)
        .await
        .expect("should store batch");

    assert_eq!(store.count().await.expect("should count"), 3);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), DIM)
        .await
        .expect("should create store");

    let mut record = create_test_record(0, "grounding.pdf");
    record.vector = vec![0.1; DIM + 1];

    let result = store.store_batch(vec![record]).await;
    assert!(matches!(result, Err(SopError::Index(_))));
}

#[tokio::test]
async fn search_returns_nearest_chunks() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), DIM)
        .await
        .expect("should create store");

    let records = vec![
        create_test_record(0, "grounding.pdf"),
        create_test_record(1, "grounding.pdf"),
        create_test_record(2, "switching.pdf"),
    ];
    store
        .store_batch(records)
        .await
        .expect("should store batch");

    let query = create_test_record(0, "grounding.pdf").vector;
    let results = store.search(&query, 2).await.expect("search should succeed");

    assert_eq!(results.len(), 2);
    // Exact match first, with cosine distance ~0
    assert_eq!(results[0].metadata.chunk_index, 0);
    assert!(results[0].distance.abs() < 1e-5);
    assert!(results[0].similarity > 0.99);
    assert!(results[0].similarity >= results[1].similarity);
    assert!(!results[0].metadata.content.is_empty());
}

#[tokio::test]
async fn search_on_empty_index_is_a_valid_empty_result() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), DIM)
        .await
        .expect("should create store");

    let query = vec![1.0_f32; DIM];
    let results = store
        .search(&query, 5)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
}

#[tokio::test]
async fn create_overwrites_the_previous_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let store = VectorStore::create(temp_dir.path(), DIM)
            .await
            .expect("should create store");
        store
            .store_batch(vec![create_test_record(0, "old-manual.pdf")])
            .await
            .expect("should store batch");
        assert_eq!(store.count().await.expect("should count"), 1);
    }

    let store = VectorStore::create(temp_dir.path(), DIM)
        .await
        .expect("should recreate store");
    assert_eq!(store.count().await.expect("should count"), 0);
}
