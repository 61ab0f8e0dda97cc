use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as RobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use related_core::config::{expand_path, EmbeddingSettings};
pub use related_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch_on_device;

/// Sentence encoder over a local RoBERTa-family checkpoint
/// (e.g. `paraphrase-distilroberta-base-v2`), mean-pooled and L2-normalized.
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl EmbeddingModel {
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: RobertaConfig = serde_json::from_str(&raw_config)?;
        let meta: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = meta["hidden_size"].as_u64().ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let pad_id = meta["pad_token_id"].as_u64().map_or(1, |v| v as u32);
        let max_positions = meta["max_position_embeddings"].as_u64().map_or(usize::MAX, |v| v as usize);
        // RoBERTa position ids start after the padding index.
        let max_len = max_len.min(max_positions.saturating_sub(pad_id as usize + 1)).max(1);

        let vb = load_weights(model_dir, DType::F32, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, max_len, "embedding model ready");
        Ok(Self { model, tokenizer, device, dim, max_len, pad_id })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_batch_on_device(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = Tensor::zeros(input_ids.shape(), DType::I64, &self.device)?;
        let hidden_states = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(vec![]); }
        self.forward(texts)
    }
}

fn load_weights(model_dir: &Path, dtype: DType, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the file is memory-mapped read-only and not modified while the model lives.
        return Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, device)? });
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .map_err(|e| anyhow!("Failed to read weights from {}: {}", weights_path.display(), e))?;
    // Sentence-transformers checkpoints prefix encoder weights with the architecture name.
    let weights_map: std::collections::HashMap<String, Tensor> = weights
        .into_iter()
        .map(|(name, t)| (name.strip_prefix("roberta.").map(str::to_string).unwrap_or(name), t))
        .collect();
    Ok(VarBuilder::from_tensors(weights_map, dtype, device))
}

/// Deterministic bag-of-words hashing embedder for tests and offline development.
///
/// Each whitespace token lands in one bucket; the result is L2-normalized.
/// Text without tokens maps to the zero vector.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Build the embedder a run should use. `embedding.fake = true` selects
/// [`FakeEmbedder`]; otherwise the model is loaded from the resolved model
/// directory.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.fake {
        info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings)?;
    Ok(Box::new(EmbeddingModel::new(&model_dir, settings.max_len)?))
}

const DEFAULT_MODEL_DIRS: [&str; 2] =
    ["models/paraphrase-distilroberta-base-v2", "../models/paraphrase-distilroberta-base-v2"];

pub fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = expand_path(dir);
        if p.exists() { return Ok(p); }
        warn!(dir = %p.display(), "configured model dir does not exist");
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.exists() { debug!(var, dir = %p.display(), "model dir from environment"); return Ok(p); }
        }
    }
    DEFAULT_MODEL_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate embedding model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
