use anyhow::{anyhow, Result};

use candle_core::{Device, IndexOp, Module};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::BertModel;

use manualqa_core::traits::CrossEncoder;

use crate::device::select_device;
use crate::model::{resolve_model_dir, Checkpoint};
use crate::tokenize::tokenize_on_device;

/// BERT sequence classifier with a single relevance logit, scoring
/// `[CLS] query [SEP] passage [SEP]`.
pub struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    checkpoint: Checkpoint,
    device: Device,
}

impl CrossEncoderModel {
    pub fn load(model_name: &str, model_dir: Option<&str>) -> Result<Self> {
        let device = select_device();
        let dir = resolve_model_dir(model_dir, model_name)?;
        tracing::info!(model = model_name, "loading cross-encoder");
        let mut checkpoint = Checkpoint::open(&dir)?;
        let max_len = checkpoint.max_positions.min(512);
        checkpoint.truncate_to(max_len)?;
        let vb = checkpoint.var_builder(&device)?;
        let hidden = checkpoint.hidden_size;
        let bert = BertModel::load(vb.pp("bert"), &checkpoint.config)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, 1, vb.pp("classifier"))?;
        Ok(Self { bert, pooler, classifier, checkpoint, device })
    }

    fn score_pair(&self, query: &str, passage: &str) -> Result<f32> {
        let enc = tokenize_on_device(&self.checkpoint.tokenizer, (query, passage), &self.device)?;
        let hidden = self.bert.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        let values: Vec<f32> = logits.to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?;
        values.first().copied().ok_or_else(|| anyhow!("classifier produced no logit"))
    }
}

impl CrossEncoder for CrossEncoderModel {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        passages.iter().map(|p| self.score_pair(query, p)).collect()
    }
}
