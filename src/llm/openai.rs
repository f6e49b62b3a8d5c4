use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client as OpenAIClient;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::llm::prompts::{bias_detection_prompt, fact_extraction_prompt};
use crate::llm::{parse_json_response, BiasAssessment, FactExtraction, LlmCapability, LlmConfig};
use crate::TARGET_LLM_REQUEST;

/// Any server speaking the OpenAI chat completions API: OpenAI itself or a
/// local LM Studio instance.
pub struct OpenAiAdapter {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    temperature: f32,
    request_timeout: Duration,
    max_retries: u32,
}

impl OpenAiAdapter {
    pub fn new(config: &LlmConfig) -> Self {
        info!(target: TARGET_LLM_REQUEST, "Using OpenAI-compatible API at {}", config.api_base);
        let mut openai_config = OpenAIConfig::new().with_api_base(config.api_base.clone());
        if let Some(api_key) = &config.api_key {
            openai_config = openai_config.with_api_key(api_key.clone());
        }

        Self {
            client: OpenAIClient::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            request_timeout: config.request_timeout,
            max_retries: config.max_retries.max(1),
        }
    }

    /// One chat completion with `prompt` as the only user message
    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(self.temperature)
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }

    /// Sends `prompt`, retrying failures and timeouts with exponential backoff
    async fn generate(&self, prompt: &str) -> Option<String> {
        let mut backoff = 2;

        debug!(target: TARGET_LLM_REQUEST, "Starting chat completion with model {}", self.model);

        for retry_count in 0..self.max_retries {
            match timeout(self.request_timeout, self.complete(prompt)).await {
                Ok(Ok(Some(content))) if !content.trim().is_empty() => {
                    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", content);
                    return Some(content);
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
                sleep(Duration::from_secs(backoff)).await;
                backoff *= 2;
            }
        }

        error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", self.max_retries);
        None
    }
}

impl LlmCapability for OpenAiAdapter {
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
