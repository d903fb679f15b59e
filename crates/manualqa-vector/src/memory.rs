//! Brute-force cosine index held in memory. Suited to a single manual and to
//! tests; nothing is persisted.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use manualqa_core::traits::{Embedder, IndexBuilder, VectorIndex};
use manualqa_core::types::Passage;

pub struct MemoryIndex {
    entries: Vec<(Passage, Vec<f32>)>,
}

impl MemoryIndex {
    pub fn from_embedded(entries: Vec<(Passage, Vec<f32>)>) -> Self {
        Self { entries }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let sim = dot / (na * nb);
    if sim.is_nan() {
        return f32::NEG_INFINITY;
    }
    sim
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Passage>> {
        let mut scored: Vec<(f32, &Passage)> = self.entries.iter().map(|(p, v)| (cosine(query_vec, v), p)).collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, p)| p.clone()).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

pub struct MemoryIndexBuilder {
    embedder: Arc<dyn Embedder>,
}

impl MemoryIndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl IndexBuilder for MemoryIndexBuilder {
    type Handle = MemoryIndex;

    async fn build(&self, passages: Vec<Passage>) -> Result<MemoryIndex> {
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        anyhow::ensure!(vectors.len() == passages.len(), "embedder returned {} vectors for {} passages", vectors.len(), passages.len());
        Ok(MemoryIndex::from_embedded(passages.into_iter().zip(vectors).collect()))
    }
}
