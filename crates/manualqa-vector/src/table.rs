//! LanceDB connection helpers and the key/value meta table that records the
//! ingestion manifest.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, Utc};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::schema::meta_schema;

pub const MANIFEST_KEY: &str = "ingestion_manifest";

/// Written as the last step of a successful build. An index without one was
/// never completely ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionManifest {
    pub completed_at: DateTime<Utc>,
    pub passages: usize,
    pub embedder_id: String,
    pub dim: usize,
}

pub fn meta_table_name(table: &str) -> String {
    format!("{table}_meta")
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

/// Upserts one row of the `<table>_meta` table. The ingestion manifest is
/// stored here under [`MANIFEST_KEY`].
pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_table(conn, table, meta_schema()).await?;
    let t = conn.open_table(table).execute().await?;
    let rb = RecordBatch::try_new(
        meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), meta_schema()));
    // key is unique: upsert
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await?;
    Ok(())
}

/// Value stored under `key`, or `None` when the meta table or key is absent
/// (an index whose manifest was never written).
pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, table).await? {
        return Ok(None);
    }
    let t = conn.open_table(table).execute().await?;
    let mut stream = t.query().only_if(format!("key = '{}'", key.replace('\'', "''"))).execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        if batch.num_rows() == 0 {
            continue;
        }
        let val = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("meta.value column missing"))?;
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}

pub async fn write_manifest(conn: &Connection, table: &str, manifest: &IngestionManifest) -> Result<()> {
    set_meta(conn, &meta_table_name(table), MANIFEST_KEY, &serde_json::to_string(manifest)?).await
}

pub async fn read_manifest(conn: &Connection, table: &str) -> Result<Option<IngestionManifest>> {
    match get_meta(conn, &meta_table_name(table), MANIFEST_KEY).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}
