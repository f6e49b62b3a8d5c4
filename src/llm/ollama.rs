use anyhow::{anyhow, Result};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::llm::prompts::{bias_detection_prompt, fact_extraction_prompt};
use crate::llm::{parse_json_response, BiasAssessment, FactExtraction, LlmCapability, LlmConfig};
use crate::TARGET_LLM_REQUEST;

/// Local model served by Ollama
pub struct OllamaAdapter {
    ollama: Ollama,
    model: String,
    temperature: f32,
    request_timeout: Duration,
    max_retries: u32,
}

impl OllamaAdapter {
    pub fn new(config: &LlmConfig) -> Self {
        info!(target: TARGET_LLM_REQUEST, "Connecting to Ollama at {}:{}", config.host, config.port);
        Self {
            ollama: Ollama::new(config.host.clone(), config.port),
            model: config.model.clone(),
            temperature: config.temperature,
            request_timeout: config.request_timeout,
            max_retries: config.max_retries.max(1),
        }
    }

    /// Sends `prompt`, retrying failures and timeouts with exponential backoff
    async fn generate(&self, prompt: &str) -> Option<String> {
        let mut backoff = 2;

        debug!(target: TARGET_LLM_REQUEST, "Starting LLM generation with model {}", self.model);

        for retry_count in 0..self.max_retries {
            let mut request = GenerationRequest::new(self.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(self.temperature));

            match timeout(self.request_timeout, self.ollama.generate(request)).await {
                Ok(Ok(response)) if !response.response.trim().is_empty() => {
                    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response.response);
                    return Some(response.response);
                }
                Ok(Ok(_)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Empty LLM response ({}/{})", retry_count + 1, self.max_retries);
                }
                Ok(Err(e)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error generating response ({}/{}): {}", retry_count + 1, self.max_retries, e);
                }
                Err(_) => {
                    warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {:?} ({}/{})", self.request_timeout, retry_count + 1, self.max_retries);
                }
            }

            if retry_count + 1 < self.max_retries {
                debug!(target: TARGET_LLM_REQUEST, "Backing off for {} seconds before retry", backoff);
                sleep(Duration::from_secs(backoff)).await;
                backoff *= 2;
            }
        }

        error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", self.max_retries);
        None
    }
}

impl LlmCapability for OllamaAdapter {
    async fn detect_bias(&self, text: &str) -> Result<BiasAssessment> {
        let response = self
            .generate(&bias_detection_prompt(text))
            .await
            .ok_or_else(|| anyhow!("Bias detection failed with model {}", self.model))?;
        let assessment: BiasAssessment = parse_json_response(&response)?;
        Ok(assessment.normalized())
    }

    async fn extract_facts(&self, text: &str) -> Result<FactExtraction> {
        let response = self
            .generate(&fact_extraction_prompt(text))
            .await
            .ok_or_else(|| anyhow!("Fact extraction failed with model {}", self.model))?;
        parse_json_response(&response)
    }
}
