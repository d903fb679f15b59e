//! Locating and loading local BERT-family checkpoints.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::Config as BertConfig;
use tokenizers::Tokenizer;

use manualqa_core::config::expand_path;

use crate::tokenize::configure_truncation;

/// Tokenizer, config and weights of one checkpoint directory.
pub struct Checkpoint {
    pub dir: PathBuf,
    pub tokenizer: Tokenizer,
    pub config: BertConfig,
    pub hidden_size: usize,
    pub max_positions: usize,
}

impl Checkpoint {
    pub fn open(dir: &Path) -> Result<Self> {
        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let hidden_size = value["hidden_size"]
            .as_u64()
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let max_positions = value["max_position_embeddings"].as_u64().unwrap_or(512) as usize;
        Ok(Self { dir: dir.to_path_buf(), tokenizer, config, hidden_size, max_positions })
    }

    /// Applies [`configure_truncation`] to the checkpoint's tokenizer.
    pub fn truncate_to(&mut self, max_len: usize) -> Result<()> {
        configure_truncation(&mut self.tokenizer, max_len)
    }

    /// Prefers `model.safetensors`, falling back to `pytorch_model.bin`.
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let safetensors = self.dir.join("model.safetensors");
        if safetensors.exists() {
            // SAFETY: the checkpoint file is not modified while mapped.
            let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
            return Ok(vb);
        }
        let weights_path = self.dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("reading {}", weights_path.display()))?;
        let weights_map: HashMap<String, candle_core::Tensor> = weights.into_iter().collect();
        Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
    }
}

/// Finds the checkpoint directory for `model`: the configured directory, then
/// `models/<name>` and `../models/<name>` where `<name>` is the last path
/// segment of the model identifier.
pub fn resolve_model_dir(configured: Option<&str>, model: &str) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.exists() {
            tracing::info!(dir = %p.display(), "using configured model dir");
            return Ok(p);
        }
        return Err(anyhow!("configured model dir {} does not exist", p.display()));
    }
    let name = model.rsplit('/').next().unwrap_or(model);
    for root in ["models", "../models"] {
        let p = Path::new(root).join(name);
        if p.exists() {
            tracing::info!(dir = %p.display(), "using model dir");
            return Ok(p);
        }
    }
    Err(anyhow!("Could not locate model directory for {model}"))
}

/// Short model name used in embedder ids.
pub fn short_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}
