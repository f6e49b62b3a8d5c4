use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::article::Article;
use crate::db::Database;
use crate::vector::{EmbeddingConfig, EmbeddingProvider, TARGET_VECTOR};

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    config: EmbeddingConfig,
}

/// Sentence embeddings from a local BERT-family model, cached in the database.
///
/// Constructed explicitly and passed to the cluster builder. The model is
/// loaded by [`EmbeddingService::init`] and released by
/// [`EmbeddingService::close`]; until `init` succeeds every computation
/// returns `None`.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    db: Database,
    loaded: Option<Arc<LoadedModel>>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig, db: Database) -> Self {
        Self {
            config,
            db,
            loaded: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    /// Downloads missing model files and loads the tokenizer and weights
    pub async fn init(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            return Ok(());
        }

        let start = Instant::now();
        self.config.ensure_models_exist().await?;
        let download_done = Instant::now();

        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || load_model(config)).await??;
        self.loaded = Some(Arc::new(loaded));

        info!(target: TARGET_VECTOR,
            "Embedding model {} ready: model check {:?}; load {:?}",
            self.config.model_name,
            download_done.duration_since(start),
            download_done.elapsed()
        );
        Ok(())
    }

    /// Releases the model. A later [`EmbeddingService::init`] loads it again.
    pub fn close(&mut self) {
        if self.loaded.take().is_some() {
            info!(target: TARGET_VECTOR, "Embedding model {} released", self.config.model_name);
        }
    }
}

fn load_model(config: EmbeddingConfig) -> Result<LoadedModel> {
    info!(target: TARGET_VECTOR, "Loading embedding model from {}", config.model_dir().display());

    let bert_config: BertConfig =
        serde_json::from_str(&std::fs::read_to_string(config.file_path("config.json"))?)?;

    let tokenizer = Tokenizer::from_file(config.file_path("tokenizer.json")).map_err(|e| {
        error!(target: TARGET_VECTOR, "!!! Failed to load tokenizer: {}", e);
        anyhow!("Failed to load tokenizer: {}", e)
    })?;

    let tensors = candle_core::safetensors::load_buffer(
        &std::fs::read(config.file_path("model.safetensors"))?,
        &config.device,
    )
    .map_err(|e| {
        error!(target: TARGET_VECTOR, "!!! Failed to load model tensors: {}", e);
        anyhow!("Failed to load model tensors: {}", e)
    })?;

    let vb = VarBuilder::from_tensors(tensors, DType::F32, &config.device);
    let model = BertModel::load(vb, &bert_config).map_err(|e| {
        error!(target: TARGET_VECTOR, "!!! Failed to load BERT model: {}", e);
        anyhow!("Failed to load BERT model: {}", e)
    })?;

    Ok(LoadedModel {
        model,
        tokenizer,
        config,
    })
}

/// Mean-pooled, L2-normalized sentence embedding
fn embed_text(loaded: &LoadedModel, text: &str) -> Result<Vec<f32>> {
    let device = &loaded.config.device;
    let encoding = loaded
        .tokenizer
        .encode(text, true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let max_len = loaded.config.max_tokens;
    let input_ids: Vec<u32> = encoding.get_ids().iter().take(max_len).copied().collect();
    let attention_mask: Vec<u32> = encoding
        .get_attention_mask()
        .iter()
        .take(max_len)
        .copied()
        .collect();

    if input_ids.is_empty() {
        return Err(anyhow!("Tokenizer produced no tokens"));
    }

    let input_ids = Tensor::new(input_ids.as_slice(), device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(attention_mask.as_slice(), device)?.unsqueeze(0)?;
    let token_type_ids = input_ids.zeros_like()?;

    let hidden_state = loaded
        .model
        .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

    // Zero out padding positions before pooling
    let mask = attention_mask.to_dtype(DType::F32)?;
    let mask_expanded = mask.unsqueeze(2)?.expand(hidden_state.shape())?;
    let summed = hidden_state.mul(&mask_expanded)?.sum(1)?;

    let counts = mask.sum(1)?.unsqueeze(1)?.clamp(1.0, f32::MAX)?;
    let mean_pooled = summed.div(&counts.expand(summed.shape())?)?;

    let norm = mean_pooled.sqr()?.sum(1)?.sqrt()?.unsqueeze(1)?;
    let normalized = mean_pooled.div(&norm.expand(mean_pooled.shape())?)?;

    Ok(normalized.squeeze(0)?.to_vec1::<f32>()?)
}

impl EmbeddingProvider for EmbeddingService {
    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn cached_embedding(&self, article_id: i64) -> Result<Option<Vec<f32>>> {
        self.db.get_embedding(article_id).await
    }

    async fn compute_embedding(&self, article: &Article) -> Option<Vec<f32>> {
        let Some(loaded) = self.loaded.clone() else {
            warn!(target: TARGET_VECTOR, "Embedding requested for article {} before model init", article.id);
            return None;
        };

        let text: String = article
            .title_with_excerpt()
            .chars()
            .take(self.config.max_text_chars)
            .collect();
        let start = Instant::now();
        let task = tokio::task::spawn_blocking(move || embed_text(&loaded, &text));

        match timeout(self.config.timeout, task).await {
            Ok(Ok(Ok(embedding))) => {
                if embedding.is_empty() || embedding.iter().any(|x| !x.is_finite()) {
                    error!(target: TARGET_VECTOR, "Malformed embedding for article {}", article.id);
                    return None;
                }
                debug!(target: TARGET_VECTOR,
                    "Embedded article {} in {:?} ({} dimensions)",
                    article.id,
                    start.elapsed(),
                    embedding.len()
                );
                Some(embedding)
            }
            Ok(Ok(Err(e))) => {
                error!(target: TARGET_VECTOR, "Failed to embed article {}: {:?}", article.id, e);
                None
            }
            Ok(Err(e)) => {
                error!(target: TARGET_VECTOR, "Embedding task for article {} panicked: {}", article.id, e);
                None
            }
            Err(_) => {
                warn!(target: TARGET_VECTOR,
                    "Embedding article {} timed out after {:?}",
                    article.id, self.config.timeout
                );
                None
            }
        }
    }

    async fn cache_embedding(
        &self,
        article_id: i64,
        embedding: &[f32],
        model_name: &str,
    ) -> Result<()> {
        self.db.store_embedding(article_id, embedding, model_name).await
    }
}
