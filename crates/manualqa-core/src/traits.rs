//! Narrow seams to the external collaborators.
//!
//! Compute-bound local models (`Embedder`, `CrossEncoder`) are synchronous;
//! I/O-bound services are async so they can be awaited without holding a
//! lock. Every implementation must be safe to share across concurrent queries.

use async_trait::async_trait;
use std::path::Path;

use crate::types::Passage;

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model (e.g. `local:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    /// One L2-normalized vector of length `dim()` per input text.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

pub trait CrossEncoder: Send + Sync {
    /// One relevance score per passage, in input order. Higher is better.
    fn score(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` passages in descending similarity to `query_vec`.
    async fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Passage>>;

    async fn len(&self) -> anyhow::Result<usize>;
}

/// Index construction. Takes ownership of the passages: the core keeps no
/// reference to them after the handoff.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    type Handle: VectorIndex;

    async fn build(&self, passages: Vec<Passage>) -> anyhow::Result<Self::Handle>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Resolves one document into its ordered page texts.
pub trait PageLoader: Send + Sync {
    fn load(&self, document: &Path) -> anyhow::Result<Vec<String>>;
}
