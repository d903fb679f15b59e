use std::sync::Arc;

use tempfile::TempDir;

use manualqa_core::chunker::AdaptiveChunker;
use manualqa_core::error::Error;
use manualqa_core::pipeline::IngestionPipeline;
use manualqa_core::traits::{Embedder, IndexBuilder, VectorIndex};
use manualqa_core::types::Passage;
use manualqa_embed::FakeEmbedder;
use manualqa_vector::schema::passages_schema;
use manualqa_vector::table::{ensure_table, open_db};
use manualqa_vector::{LanceIndexBuilder, LanceVectorIndex, MemoryIndexBuilder};

const TABLE: &str = "passages_test";

fn manual_passages() -> Vec<Passage> {
    let pipeline = IngestionPipeline::new(AdaptiveChunker::new(200, 40));
    let pages = [
        "LM.10.1 Limitations: the maximum landing weight is 66,360 kg.",
        "Fuel system: crossfeed valve operation and fuel pump switches.",
        "Hydraulic system A supplies the flight controls and landing gear.",
        "Takeoff performance table\nFLAPS 5 1200\nFLAPS 15 1100",
    ];
    (1u32..)
        .zip(pages)
        .flat_map(|(n, text)| pipeline.process_page(text, "fcom.txt", "fcom", n))
        .collect()
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(FakeEmbedder::default())
}

#[tokio::test]
async fn lancedb_build_open_and_search() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("lancedb");
    let passages = manual_passages();
    let expected = passages.len();

    let builder = LanceIndexBuilder::new(&db_path, TABLE, embedder()).batch_size(2);
    let built = builder.build(passages).await.expect("build");
    assert_eq!(built.len().await.expect("len"), expected);

    let index = LanceVectorIndex::open(&db_path, TABLE).await.expect("open");
    let manifest = index.manifest();
    assert_eq!(manifest.passages, expected);
    assert_eq!(manifest.embedder_id, "fake:xxhash:d384");
    assert_eq!(manifest.dim, 384);

    let query = FakeEmbedder::default().embed_text("maximum landing weight");
    let hits = index.search(&query, 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk_id(), "fcom:p1_c0");
    assert_eq!(hits[0].metadata.page.tags.chapter, "LM.10");
    assert!(hits[0].text.contains("66,360"));
}

#[tokio::test]
async fn rebuilding_replaces_the_previous_index() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("lancedb");
    let builder = LanceIndexBuilder::new(&db_path, TABLE, embedder());
    builder.build(manual_passages()).await.expect("first build");
    let rebuilt = builder.build(manual_passages()[..1].to_vec()).await.expect("second build");
    assert_eq!(rebuilt.len().await.expect("len"), 1);
}

#[tokio::test]
async fn empty_build_is_ready_and_searches_empty() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("lancedb");
    LanceIndexBuilder::new(&db_path, TABLE, embedder()).build(Vec::new()).await.expect("build");
    let index = LanceVectorIndex::open(&db_path, TABLE).await.expect("open");
    let hits = index.search(&vec![0.0; 384], 3).await.expect("search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn missing_or_unfinished_index_is_not_ready() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("lancedb");
    assert!(matches!(LanceVectorIndex::open(&db_path, TABLE).await, Err(Error::NotReady)));

    // passages table present but no manifest: ingestion never completed
    let db = open_db(&db_path.to_string_lossy()).await.expect("db");
    ensure_table(&db, TABLE, passages_schema(384)).await.expect("table");
    assert!(matches!(LanceVectorIndex::open(&db_path, TABLE).await, Err(Error::NotReady)));
}

#[tokio::test]
async fn memory_index_ranks_by_cosine() {
    let index = MemoryIndexBuilder::new(embedder()).build(manual_passages()).await.expect("build");
    assert_eq!(index.len().await.expect("len"), 4);
    let query = FakeEmbedder::default().embed_text("fuel crossfeed valve");
    let hits = index.search(&query, 10).await.expect("search");
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].chunk_id(), "fcom:p2_c0");
}
