//! Local embedding and cross-encoder models (candle), plus deterministic
//! fakes selected with `APP_USE_FAKE_EMBEDDINGS=1`.

use anyhow::Result;
use std::sync::Arc;

use manualqa_core::config::ModelSettings;
use manualqa_core::traits::{CrossEncoder, Embedder};

pub mod cross_encoder;
pub mod device;
pub mod embedder;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::CrossEncoderModel;
pub use embedder::BertEmbedder;
pub use fake::{FakeEmbedder, LexicalOverlapScorer};

pub fn use_fake_models() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder(models: &ModelSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_models() {
        tracing::info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::default()));
    }
    Ok(Arc::new(BertEmbedder::load(&models.embedding_model, models.embedding_dir.as_deref())?))
}

pub fn get_default_reranker(models: &ModelSettings) -> Result<Arc<dyn CrossEncoder>> {
    if use_fake_models() {
        tracing::info!("using LexicalOverlapScorer");
        return Ok(Arc::new(LexicalOverlapScorer));
    }
    Ok(Arc::new(CrossEncoderModel::load(&models.reranker_model, models.reranker_dir.as_deref())?))
}
