use anyhow::{anyhow, Result};
use candle_core::Device;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::environment::{get_env_var_or, get_env_var_parsed};
use crate::vector::{DEFAULT_EMBEDDING_MODEL, TARGET_VECTOR};

const HUGGINGFACE_URL: &str = "https://huggingface.co";

/// Files fetched for a sentence-transformer model
pub const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Configuration for the local sentence embedding model
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Hugging Face repository id, e.g. `sentence-transformers/all-MiniLM-L6-v2`
    pub model_name: String,
    pub models_dir: PathBuf,
    /// Characters of `title + excerpt` fed to the model
    pub max_text_chars: usize,
    pub max_tokens: usize,
    pub timeout: Duration,
    pub device: Device,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
            models_dir: PathBuf::from("models"),
            max_text_chars: 512,
            max_tokens: 256,
            timeout: Duration::from_secs(30),
            device: Device::Cpu,
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_name: get_env_var_or("EMBEDDING_MODEL", &defaults.model_name),
            models_dir: PathBuf::from(get_env_var_or("MODELS_DIR", "models")),
            timeout: Duration::from_secs(get_env_var_parsed(
                "EMBEDDING_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
            ..defaults
        }
    }

    /// Local directory holding this model's files
    pub fn model_dir(&self) -> PathBuf {
        self.models_dir.join(self.model_name.replace('/', "--"))
    }

    pub fn file_path(&self, file: &str) -> PathBuf {
        self.model_dir().join(file)
    }

    fn file_url(&self, file: &str) -> String {
        format!("{}/{}/resolve/main/{}", HUGGINGFACE_URL, self.model_name, file)
    }

    /// Downloads any missing model files into [`Self::model_dir`]
    pub async fn ensure_models_exist(&self) -> Result<()> {
        let dir = self.model_dir();
        if !Path::new(&dir).exists() {
            fs::create_dir_all(&dir).await?;
        }

        for file in MODEL_FILES {
            let path = self.file_path(file);
            if path.exists() {
                continue;
            }

            let url = self.file_url(file);
            info!(target: TARGET_VECTOR, "Downloading {} from {}", file, url);
            let response = reqwest::get(&url).await?;
            if !response.status().is_success() {
                return Err(anyhow!(
                    "Failed to download {}: HTTP {}",
                    url,
                    response.status()
                ));
            }
            let bytes = response.bytes().await?;
            fs::write(&path, bytes).await?;
            info!(target: TARGET_VECTOR, "Downloaded {} to {}", file, path.display());
        }

        Ok(())
    }
}
