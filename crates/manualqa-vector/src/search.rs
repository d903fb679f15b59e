use anyhow::{anyhow, Result};
use arrow_array::{Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::path::Path;

use manualqa_core::error::{Error, Service};
use manualqa_core::traits::VectorIndex;
use manualqa_core::types::{Passage, PassageMetadata};

use crate::table::{open_db, read_manifest, IngestionManifest};

/// Read handle on a completely ingested LanceDB passage table.
pub struct LanceVectorIndex {
    table: Table,
    manifest: IngestionManifest,
}

impl LanceVectorIndex {
    /// Opens the index at `db_path`. Fails with [`Error::NotReady`] when the
    /// database has no ingestion manifest for `table_name`.
    pub async fn open(db_path: &Path, table_name: &str) -> manualqa_core::Result<Self> {
        let uri = db_path.to_string_lossy().to_string();
        if !db_path.exists() {
            return Err(Error::NotReady);
        }
        let db = open_db(&uri).await.map_err(Error::upstream(Service::VectorIndex))?;
        let manifest = read_manifest(&db, table_name)
            .await
            .map_err(Error::upstream(Service::VectorIndex))?
            .ok_or(Error::NotReady)?;
        Self::from_connection(db, table_name, manifest)
            .await
            .map_err(Error::upstream(Service::VectorIndex))
    }

    pub(crate) async fn from_connection(db: Connection, table_name: &str, manifest: IngestionManifest) -> Result<Self> {
        let table = db.open_table(table_name).execute().await?;
        Ok(Self { table, manifest })
    }

    pub fn manifest(&self) -> &IngestionManifest {
        &self.manifest
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Passage>> {
        anyhow::ensure!(
            query_vec.len() == self.manifest.dim,
            "query vector has dim {}, index expects {}",
            query_vec.len(),
            self.manifest.dim
        );
        if k == 0 || self.manifest.passages == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self.table.vector_search(query_vec.to_vec())?.limit(k).execute().await?;
        let mut passages = Vec::new();
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            passages.extend(batch_to_passages(&batch)?);
        }
        passages.truncate(k);
        Ok(passages)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{name} column missing"))
}

fn batch_to_passages(batch: &RecordBatch) -> Result<Vec<Passage>> {
    let texts = string_column(batch, "text")?;
    let metadata = string_column(batch, "metadata")?;
    (0..batch.num_rows())
        .filter(|&i| !texts.is_null(i))
        .map(|i| {
            let metadata: PassageMetadata = serde_json::from_str(metadata.value(i))?;
            Ok(Passage { text: texts.value(i).to_string(), metadata })
        })
        .collect()
}
