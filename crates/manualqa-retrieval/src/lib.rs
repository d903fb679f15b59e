//! Two-stage retrieval: vector search over a widened candidate pool, then
//! cross-encoder reranking down to `top_k`.

use std::sync::Arc;
use tracing::debug;

use manualqa_core::config::RetrievalSettings;
use manualqa_core::error::{Error, Result, Service};
use manualqa_core::traits::{CrossEncoder, Embedder, VectorIndex};
use manualqa_core::types::ScoredPassage;

pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reranker: Arc<dyn CrossEncoder>,
    top_k: usize,
    pool_size: usize,
}

impl RetrievalEngine {
    /// `pool_size` is raised to `top_k` when smaller.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn CrossEncoder>,
        top_k: usize,
        pool_size: usize,
    ) -> Self {
        Self { embedder, index, reranker, top_k, pool_size: pool_size.max(top_k) }
    }

    pub fn from_settings(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn CrossEncoder>,
        settings: &RetrievalSettings,
    ) -> Self {
        Self::new(embedder, index, reranker, settings.top_k, settings.pool_size())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// At most `top_k` passages, highest cross-encoder score first. Ties keep
    /// the vector-search order. An empty index yields an empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredPassage>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let embedder = Arc::clone(&self.embedder);
        let texts = vec![query.to_string()];
        let query_vec = run_blocking(Service::Embedding, move || embedder.embed_batch(&texts))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream {
                service: Service::Embedding,
                source: anyhow::anyhow!("embedder returned no vector"),
            })?;

        let pool = self
            .index
            .search(&query_vec, self.pool_size)
            .await
            .map_err(Error::upstream(Service::VectorIndex))?;
        debug!(pool = pool.len(), requested = self.pool_size, "first-stage candidates");
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let reranker = Arc::clone(&self.reranker);
        let owned_query = query.to_string();
        let texts: Vec<String> = pool.iter().map(|p| p.text.clone()).collect();
        let scores = run_blocking(Service::CrossEncoder, move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            reranker.score(&owned_query, &refs)
        })
        .await?;
        if scores.len() != pool.len() {
            return Err(Error::Upstream {
                service: Service::CrossEncoder,
                source: anyhow::anyhow!("{} scores for {} passages", scores.len(), pool.len()),
            });
        }

        let mut ranked: Vec<ScoredPassage> =
            pool.into_iter().zip(scores).map(|(passage, score)| ScoredPassage { passage, score }).collect();
        // stable: ties keep vector-search order
        ranked.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
        ranked.truncate(self.top_k);
        debug!(returned = ranked.len(), "reranked");
        Ok(ranked)
    }
}

/// Runs CPU-bound model inference off the async worker threads.
async fn run_blocking<T, F>(service: Service, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Upstream { service, source: e.into() })?
        .map_err(Error::upstream(service))
}

/// NaN scores rank below every real score.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}
