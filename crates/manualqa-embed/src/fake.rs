//! Deterministic, model-free stand-ins used when
//! `APP_USE_FAKE_EMBEDDINGS` is set and in tests.

use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use manualqa_core::traits::{CrossEncoder, Embedder};

pub const FAKE_DIM: usize = 384;

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Feature-hashing embedder: each lowercased term adds a fixed weight to one
/// bucket, so texts sharing terms have high cosine similarity.
pub struct FakeEmbedder {
    id: String,
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { id: format!("fake:xxhash:d{dim}"), dim }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for term in terms(text) {
            let mut hasher = XxHash64::with_seed(0);
            term.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new(FAKE_DIM)
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Scores a passage by the fraction of query terms (three characters or
/// longer) it contains.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalOverlapScorer;

impl CrossEncoder for LexicalOverlapScorer {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_terms: Vec<String> = terms(query).filter(|t| t.chars().count() > 2).collect();
        if query_terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|p| {
                let passage = p.to_lowercase();
                let hits = query_terms.iter().filter(|t| passage.contains(t.as_str())).count();
                hits as f32 / query_terms.len() as f32
            })
            .collect())
    }
}
