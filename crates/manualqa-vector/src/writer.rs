use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use async_trait::async_trait;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use manualqa_core::traits::{Embedder, IndexBuilder};
use manualqa_core::types::Passage;

use crate::schema::passages_schema;
use crate::search::LanceVectorIndex;
use crate::table::{ensure_table, open_db, write_manifest, IngestionManifest};

const DEFAULT_BATCH_SIZE: usize = 64;

/// Embeds passages and writes them into a fresh LanceDB table.
///
/// Any previous database at `db_path` is removed first; the ingestion
/// manifest is written only after every passage has been stored.
pub struct LanceIndexBuilder {
    db_path: PathBuf,
    table_name: String,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

impl LanceIndexBuilder {
    pub fn new(db_path: &Path, table_name: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            table_name: table_name.to_string(),
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        Ok(pb)
    }

    async fn insert_batch(&self, db: &Connection, batch: RecordBatch) -> Result<()> {
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
        Ok(())
    }
}

#[async_trait]
impl IndexBuilder for LanceIndexBuilder {
    type Handle = LanceVectorIndex;

    async fn build(&self, passages: Vec<Passage>) -> Result<LanceVectorIndex> {
        if self.db_path.exists() {
            tracing::info!(path = %self.db_path.display(), "removing previous index");
            std::fs::remove_dir_all(&self.db_path)?;
        }
        let uri = self.db_path.to_string_lossy().to_string();
        let db = open_db(&uri).await?;
        let dim = self.embedder.dim();
        let dim_i32 = i32::try_from(dim).map_err(|_| anyhow!("embedding dim {dim} too large"))?;
        ensure_table(&db, &self.table_name, passages_schema(dim_i32)).await?;

        tracing::info!(passages = passages.len(), table = %self.table_name, "indexing passages into LanceDB");
        let pb = self.progress_bar(passages.len())?;
        for batch in passages.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts)?;
            anyhow::ensure!(
                embeddings.len() == batch.len(),
                "embedder returned {} vectors for {} passages",
                embeddings.len(),
                batch.len()
            );
            let record_batch = passages_to_record_batch(batch, &embeddings, dim_i32)?;
            self.insert_batch(&db, record_batch).await?;
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("indexing completed");

        let manifest = IngestionManifest {
            completed_at: Utc::now(),
            passages: passages.len(),
            embedder_id: self.embedder.id().to_string(),
            dim,
        };
        write_manifest(&db, &self.table_name, &manifest).await?;
        tracing::info!(passages = manifest.passages, embedder = %manifest.embedder_id, "index build completed");

        LanceVectorIndex::from_connection(db, &self.table_name, manifest).await
    }
}

fn passages_to_record_batch(passages: &[Passage], embeddings: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
    let mut chunk_ids = Vec::with_capacity(passages.len());
    let mut doc_ids = Vec::with_capacity(passages.len());
    let mut pages = Vec::with_capacity(passages.len());
    let mut content_types = Vec::with_capacity(passages.len());
    let mut texts = Vec::with_capacity(passages.len());
    let mut metadata = Vec::with_capacity(passages.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(passages.len());
    for (p, v) in passages.iter().zip(embeddings) {
        anyhow::ensure!(v.len() == dim as usize, "vector for {} has dim {}, expected {dim}", p.chunk_id(), v.len());
        chunk_ids.push(p.chunk_id().to_string());
        doc_ids.push(p.metadata.page.doc_id.clone());
        pages.push(p.page_number());
        content_types.push(p.content_type().as_str().to_string());
        texts.push(p.text.clone());
        metadata.push(serde_json::to_string(&p.metadata)?);
        vectors.push(Some(v.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(
        passages_schema(dim),
        vec![
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(UInt32Array::from(pages)),
            Arc::new(StringArray::from(content_types)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
        ],
    )?;
    Ok(record_batch)
}
