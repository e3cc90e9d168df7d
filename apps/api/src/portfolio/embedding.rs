//! Sentence embeddings for the portfolio index.
//!
//! `SentenceEmbedder` runs a BERT sentence-transformer on the CPU with Candle.
//! Token states are mean-pooled over the attention mask and L2-normalized, so
//! cosine similarity between two embeddings is their dot product.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::api::tokio::Api;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

/// Same model as the Chroma default embedding function.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Tech-stack tags and skills are short; longer input is cut.
const MAX_SEQ_LEN: usize = 256;

/// Turns texts into unit-length vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbedder {
    /// Fetches `model_id` from the Hugging Face Hub, or its local cache, and loads it.
    pub async fn from_hub(model_id: &str) -> Result<Self> {
        info!("Fetching embedding model {model_id} from Hugging Face Hub");

        let repo = Api::new()
            .context("Failed to build Hugging Face Hub client")?
            .model(model_id.to_string());

        let mut files = Vec::with_capacity(3);
        for name in ["config.json", "tokenizer.json", "model.safetensors"] {
            let path = repo
                .get(name)
                .await
                .with_context(|| format!("Failed to fetch {name} for {model_id}"))?;
            files.push(path);
        }

        Self::from_files(&files[0], &files[1], &files[2])
    }

    /// Loads a model directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::from_files(
            &dir.join("config.json"),
            &dir.join("tokenizer.json"),
            &dir.join("model.safetensors"),
        )
    }

    fn from_files(config_path: &Path, tokenizer_path: &Path, weights_path: &Path) -> Result<Self> {
        let device = Device::Cpu;

        let raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: BertConfig =
            serde_json::from_str(&raw).context("Failed to parse embedding model config")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure tokenizer truncation: {e}"))?;

        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let model = BertModel::load(vb, &config).context("Failed to load embedding model weights")?;

        info!(
            "Embedding model loaded: {} layers, hidden size {}",
            config.num_hidden_layers, config.hidden_size
        );

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {e}"))?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [batch, seq, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens only
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let pooled = summed.broadcast_div(&mask.sum(1)?)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

/// Cosine similarity of two unit vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
