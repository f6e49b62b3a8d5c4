//! Language-model analysis of article text.
//!
//! Used on demand by the CLI; the clustering pipeline never calls it.

pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod types;

pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use types::{BiasAssessment, ExtractedEntities, ExtractedFact, FactExtraction};

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::environment::{get_env_var_or, get_env_var_parsed};
use crate::TARGET_LLM_REQUEST;

/// Analysis a language model backend can perform on article text
#[allow(async_fn_in_trait)]
pub trait LlmCapability {
    async fn detect_bias(&self, text: &str) -> Result<BiasAssessment>;

    async fn extract_facts(&self, text: &str) -> Result<FactExtraction>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmAdapterKind {
    None,
    Ollama,
    OpenAi,
    LmStudio,
}

impl LlmAdapterKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(LlmAdapterKind::None),
            "ollama" => Some(LlmAdapterKind::Ollama),
            "openai" => Some(LlmAdapterKind::OpenAi),
            "lmstudio" | "lm-studio" => Some(LlmAdapterKind::LmStudio),
            _ => None,
        }
    }

    /// Prefix of the adapter's `*_BASE_URL`, `*_API_KEY` and `*_MODEL` variables
    fn env_prefix(self) -> Option<&'static str> {
        match self {
            LlmAdapterKind::OpenAi => Some("OPENAI"),
            LlmAdapterKind::LmStudio => Some("LMSTUDIO"),
            LlmAdapterKind::None | LlmAdapterKind::Ollama => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub adapter: LlmAdapterKind,
    /// Ollama host and port
    pub host: String,
    pub port: u16,
    /// Base URL of an OpenAI-compatible API, including the `/v1` suffix
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            adapter: LlmAdapterKind::None,
            host: "http://localhost".to_string(),
            port: 11434,
            api_base: String::new(),
            api_key: None,
            model: "llama2".to_string(),
            temperature: 0.3,
            request_timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }
}

impl LlmConfig {
    /// Built-in defaults for `adapter`, before any environment overrides
    pub fn for_adapter(adapter: LlmAdapterKind) -> Self {
        let defaults = Self {
            adapter,
            ..Self::default()
        };
        match adapter {
            LlmAdapterKind::OpenAi => Self {
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                ..defaults
            },
            LlmAdapterKind::LmStudio => Self {
                api_base: "http://localhost:1234/v1".to_string(),
                api_key: Some("lm-studio".to_string()),
                model: "local-model".to_string(),
                ..defaults
            },
            LlmAdapterKind::None | LlmAdapterKind::Ollama => defaults,
        }
    }

    pub fn from_env() -> Result<Self> {
        let adapter_name = get_env_var_or("LLM_ADAPTER", "none");
        let adapter = LlmAdapterKind::parse(&adapter_name)
            .ok_or_else(|| anyhow!("Unknown LLM_ADAPTER: {}", adapter_name))?;
        let defaults = Self::for_adapter(adapter);
        let temperature = get_env_var_parsed("LLM_TEMPERATURE", defaults.temperature);

        let config = match adapter.env_prefix() {
            Some(prefix) => {
                let api_key = std::env::var(format!("{}_API_KEY", prefix))
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .or(defaults.api_key.clone());
                Self {
                    api_base: get_env_var_or(&format!("{}_BASE_URL", prefix), &defaults.api_base),
                    model: get_env_var_or(&format!("{}_MODEL", prefix), &defaults.model),
                    api_key,
                    temperature,
                    ..defaults
                }
            }
            None => Self {
                host: get_env_var_or("OLLAMA_HOST", &defaults.host),
                port: get_env_var_parsed("OLLAMA_PORT", defaults.port),
                model: get_env_var_or("OLLAMA_MODEL", &defaults.model),
                temperature,
                ..defaults
            },
        };

        if config.adapter == LlmAdapterKind::OpenAi && config.api_key.is_none() {
            return Err(anyhow!("OPENAI_API_KEY is required when LLM_ADAPTER=openai"));
        }
        Ok(config)
    }
}

/// The configured backend. Variants are chosen by [`LlmConfig::adapter`].
pub enum LlmAdapter {
    Ollama(OllamaAdapter),
    /// OpenAI and LM Studio share the chat completions API
    OpenAi(OpenAiAdapter),
}

impl LlmAdapter {
    /// `None` when no adapter is configured
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        match config.adapter {
            LlmAdapterKind::None => None,
            LlmAdapterKind::Ollama => Some(LlmAdapter::Ollama(OllamaAdapter::new(config))),
            LlmAdapterKind::OpenAi | LlmAdapterKind::LmStudio => {
                Some(LlmAdapter::OpenAi(OpenAiAdapter::new(config)))
            }
        }
    }
}

impl LlmCapability for LlmAdapter {
    async fn detect_bias(&self, text: &str) -> Result<BiasAssessment> {
        match self {
            LlmAdapter::Ollama(adapter) => adapter.detect_bias(text).await,
            LlmAdapter::OpenAi(adapter) => adapter.detect_bias(text).await,
        }
    }

    async fn extract_facts(&self, text: &str) -> Result<FactExtraction> {
        match self {
            LlmAdapter::Ollama(adapter) => adapter.extract_facts(text).await,
            LlmAdapter::OpenAi(adapter) => adapter.extract_facts(text).await,
        }
    }
}

/// Parses the outermost `{ ... }` block of a model response, or the whole
/// response when it has no braces.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T> {
    let candidate = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    };

    serde_json::from_str(candidate).with_context(|| {
        debug!(target: TARGET_LLM_REQUEST, "Raw response: {}", response);
        "Failed to parse JSON from LLM response"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::BiasLabel;

    #[test]
    fn test_parse_json_surrounded_by_prose() {
        let response = r#"Sure! Here is the analysis:
{"bias_score": -0.4, "confidence": 0.7, "reasoning": "Loaded language", "indicators": ["tone"]}
Let me know if you need more."#;
        let assessment: BiasAssessment = parse_json_response(response).unwrap();
        assert_eq!(assessment.bias_score, -0.4);
        assert_eq!(assessment.indicators, vec!["tone"]);
        assert_eq!(assessment.label(), BiasLabel::CenterLeft);
    }

    #[test]
    fn test_parse_json_missing_fields_default() {
        let extraction: FactExtraction =
            parse_json_response(r#"{"facts": [{"claim": "Turnout rose 12 percent", "type": "statistic"}]}"#)
                .unwrap();
        assert_eq!(extraction.facts.len(), 1);
        assert_eq!(extraction.facts[0].kind, "statistic");
        assert!(extraction.entities.people.is_empty());
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        assert!(parse_json_response::<BiasAssessment>("no json here").is_err());
        assert!(parse_json_response::<BiasAssessment>("} backwards {").is_err());
    }

    #[test]
    fn test_assessment_normalized() {
        let assessment = BiasAssessment {
            bias_score: 3.0,
            confidence: f64::NAN,
            ..Default::default()
        }
        .normalized();
        assert_eq!(assessment.bias_score, 1.0);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn test_adapter_kind_parsing() {
        assert_eq!(LlmAdapterKind::parse("Ollama"), Some(LlmAdapterKind::Ollama));
        assert_eq!(LlmAdapterKind::parse(""), Some(LlmAdapterKind::None));
        assert_eq!(LlmAdapterKind::parse("openai"), Some(LlmAdapterKind::OpenAi));
        assert_eq!(LlmAdapterKind::parse(" LMStudio "), Some(LlmAdapterKind::LmStudio));
        assert_eq!(LlmAdapterKind::parse("gemini"), None);
        assert!(LlmAdapter::from_config(&LlmConfig::default()).is_none());
    }

    #[test]
    fn test_openai_compatible_defaults() {
        let lmstudio = LlmConfig::for_adapter(LlmAdapterKind::LmStudio);
        assert_eq!(lmstudio.api_base, "http://localhost:1234/v1");
        assert_eq!(lmstudio.api_key.as_deref(), Some("lm-studio"));
        assert_eq!(lmstudio.model, "local-model");

        let openai = LlmConfig::for_adapter(LlmAdapterKind::OpenAi);
        assert_eq!(openai.api_base, "https://api.openai.com/v1");
        assert!(openai.api_key.is_none());
        assert_eq!(openai.model, "gpt-4o-mini");

        let ollama = LlmConfig::for_adapter(LlmAdapterKind::Ollama);
        assert_eq!(ollama.port, 11434);
        assert!(ollama.api_base.is_empty());
    }

    #[test]
    fn test_openai_compatible_kinds_share_one_adapter() {
        for kind in [LlmAdapterKind::OpenAi, LlmAdapterKind::LmStudio] {
            let config = LlmConfig {
                api_key: Some("test-key".to_string()),
                ..LlmConfig::for_adapter(kind)
            };
            assert!(matches!(
                LlmAdapter::from_config(&config),
                Some(LlmAdapter::OpenAi(_))
            ));
        }
        assert!(matches!(
            LlmAdapter::from_config(&LlmConfig::for_adapter(LlmAdapterKind::Ollama)),
            Some(LlmAdapter::Ollama(_))
        ));
    }
}
