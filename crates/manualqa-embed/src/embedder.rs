use anyhow::Result;
use std::time::Instant;

use candle_core::Device;
use candle_transformers::models::bert::BertModel;

use manualqa_core::traits::Embedder;

use crate::device::select_device;
use crate::model::{resolve_model_dir, short_name, Checkpoint};
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

/// Sentence embeddings from a local BERT checkpoint (mean pooling + L2).
pub struct BertEmbedder {
    id: String,
    dim: usize,
    model: BertModel,
    checkpoint: Checkpoint,
    device: Device,
}

impl BertEmbedder {
    pub fn load(model_name: &str, model_dir: Option<&str>) -> Result<Self> {
        let device = select_device();
        let dir = resolve_model_dir(model_dir, model_name)?;
        tracing::info!(model = model_name, "loading embedding model");
        let mut checkpoint = Checkpoint::open(&dir)?;
        let max_len = checkpoint.max_positions.min(256);
        checkpoint.truncate_to(max_len)?;
        let vb = checkpoint.var_builder(&device)?;
        let model = BertModel::load(vb, &checkpoint.config)?;
        let dim = checkpoint.hidden_size;
        tracing::info!(model = model_name, dim, "embedding model loaded");
        Ok(Self {
            id: format!("local:{}:d{dim}", short_name(model_name)),
            dim,
            model,
            checkpoint,
            device,
        })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = tokenize_on_device(&self.checkpoint.tokenizer, text, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(emb.len() == self.dim, "embedding dim {} != {}", emb.len(), self.dim);
        if start.elapsed().as_millis() > 100 {
            tracing::debug!(ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}
