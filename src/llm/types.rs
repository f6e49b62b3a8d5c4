use serde::{Deserialize, Serialize};

use crate::article::BiasLabel;

/// Political lean of a piece of text as judged by a language model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BiasAssessment {
    /// -1.0 (far left) to 1.0 (far right)
    #[serde(default)]
    pub bias_score: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl BiasAssessment {
    /// Clamps the score and confidence into their documented ranges
    pub fn normalized(mut self) -> Self {
        self.bias_score = if self.bias_score.is_finite() {
            self.bias_score.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn label(&self) -> BiasLabel {
        BiasLabel::from_score(self.bias_score)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub claim: String,
    /// statistic, quote, event, cause-effect or policy
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FactExtraction {
    #[serde(default)]
    pub facts: Vec<ExtractedFact>,
    #[serde(default)]
    pub entities: ExtractedEntities,
}
