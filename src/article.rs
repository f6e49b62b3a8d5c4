use serde::{Deserialize, Serialize};
use std::fmt;

/// Political bias label attached to a news source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiasLabel {
    Left,
    CenterLeft,
    Center,
    CenterRight,
    Right,
}

impl BiasLabel {
    /// All labels, ordered from left to right
    pub const ALL: [BiasLabel; 5] = [
        BiasLabel::Left,
        BiasLabel::CenterLeft,
        BiasLabel::Center,
        BiasLabel::CenterRight,
        BiasLabel::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLabel::Left => "left",
            BiasLabel::CenterLeft => "center-left",
            BiasLabel::Center => "center",
            BiasLabel::CenterRight => "center-right",
            BiasLabel::Right => "right",
        }
    }

    /// Parses a stored label. Unknown labels return `None` rather than an error.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "left" => Some(BiasLabel::Left),
            "center-left" => Some(BiasLabel::CenterLeft),
            "center" => Some(BiasLabel::Center),
            "center-right" => Some(BiasLabel::CenterRight),
            "right" => Some(BiasLabel::Right),
            _ => None,
        }
    }

    /// Numeric position on the -1.0 (left) to 1.0 (right) axis
    pub fn score(&self) -> f64 {
        match self {
            BiasLabel::Left => -1.0,
            BiasLabel::CenterLeft => -0.5,
            BiasLabel::Center => 0.0,
            BiasLabel::CenterRight => 0.5,
            BiasLabel::Right => 1.0,
        }
    }

    /// Maps a numeric score to the nearest label. Ties resolve toward the left.
    pub fn from_score(score: f64) -> Self {
        let clamped = if score.is_nan() {
            0.0
        } else {
            score.clamp(-1.0, 1.0)
        };

        let mut best = BiasLabel::Left;
        for label in BiasLabel::ALL {
            if (label.score() - clamped).abs() < (best.score() - clamped).abs() {
                best = label;
            }
        }
        best
    }
}

impl fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A news article joined with its source, as read by the clustering core.
///
/// Articles are created by the ingestion side and never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub source_id: i64,
    pub source_name: String,
    /// Raw label as stored on the source; may be outside the known set
    pub source_bias: String,
    pub source_bias_score: f64,
    pub published_at: Option<String>,
}

impl Article {
    /// Known bias label for the article's source, if recognized
    pub fn bias_label(&self) -> Option<BiasLabel> {
        BiasLabel::parse(&self.source_bias)
    }

    /// Title and excerpt joined by a single space
    pub fn title_with_excerpt(&self) -> String {
        format!("{} {}", self.title, self.excerpt.as_deref().unwrap_or(""))
    }
}
