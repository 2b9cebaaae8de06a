//! Query model and prompt builder.
//!
//! Turns a raw question plus the optional preferences from the entry form into
//! the instruction fragments appended to the structured system prompt. Every
//! function here is pure.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which evidence the model should weight most heavily.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    /// All sources weighted equally.
    #[default]
    Balanced,
    /// Polymarket first, Kalshi second.
    Polymarket,
    /// Kalshi first, Polymarket second.
    Kalshi,
    /// Historical precedent first, markets as validation.
    Historical,
}

/// How the model should calibrate its confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBias {
    /// Detect the question type and calibrate accordingly.
    #[default]
    Auto,
    /// Lower confidence, wider ranges.
    Conservative,
    /// Higher confidence when data supports it.
    Optimistic,
    /// Stricter scrutiny for financial questions.
    Financial,
    /// Account for rapid change in technology questions.
    Tech,
}

impl SourcePreference {
    /// Instruction fragment for this preference.
    pub fn instruction(self) -> &'static str {
        match self {
            SourcePreference::Polymarket => {
                "PRIORITIZE Polymarket data when available. Use Kalshi as secondary source."
            }
            SourcePreference::Kalshi => {
                "PRIORITIZE Kalshi data when available. Use Polymarket as secondary source."
            }
            SourcePreference::Historical => {
                "PRIORITIZE historical precedents and past event data. Use prediction markets as secondary validation."
            }
            SourcePreference::Balanced => {
                "Use all available sources equally (balanced approach)."
            }
        }
    }
}

impl ConfidenceBias {
    /// Instruction fragment for this bias.
    pub fn instruction(self) -> &'static str {
        match self {
            ConfidenceBias::Conservative => {
                "Bias towards LOWER confidence levels and WIDER probability ranges. Be more cautious."
            }
            ConfidenceBias::Optimistic => {
                "Bias towards HIGHER confidence when data is available. Allow narrower ranges when justified."
            }
            ConfidenceBias::Financial => {
                "For financial questions, apply stricter scrutiny and lean towards lower confidence unless prediction markets are strongly aligned."
            }
            ConfidenceBias::Tech => {
                "For technology/innovation questions, account for rapid change and unexpected developments. Balance optimism with technical realities."
            }
            ConfidenceBias::Auto => {
                "Auto-detect the question type and apply appropriate confidence calibration."
            }
        }
    }
}

/// Unknown values fall back to [`SourcePreference::Balanced`].
impl FromStr for SourcePreference {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "polymarket" => SourcePreference::Polymarket,
            "kalshi" => SourcePreference::Kalshi,
            "historical" => SourcePreference::Historical,
            _ => SourcePreference::Balanced,
        })
    }
}

/// Unknown values fall back to [`ConfidenceBias::Auto`].
impl FromStr for ConfidenceBias {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "conservative" => ConfidenceBias::Conservative,
            "optimistic" => ConfidenceBias::Optimistic,
            "financial" => ConfidenceBias::Financial,
            "tech" => ConfidenceBias::Tech,
            _ => ConfidenceBias::Auto,
        })
    }
}

impl fmt::Display for SourcePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePreference::Balanced => write!(f, "balanced"),
            SourcePreference::Polymarket => write!(f, "polymarket"),
            SourcePreference::Kalshi => write!(f, "kalshi"),
            SourcePreference::Historical => write!(f, "historical"),
        }
    }
}

impl fmt::Display for ConfidenceBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBias::Auto => write!(f, "auto"),
            ConfidenceBias::Conservative => write!(f, "conservative"),
            ConfidenceBias::Optimistic => write!(f, "optimistic"),
            ConfidenceBias::Financial => write!(f, "financial"),
            ConfidenceBias::Tech => write!(f, "tech"),
        }
    }
}

/// A submitted question with its preferences. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    #[serde(default)]
    pub source_preference: SourcePreference,
    #[serde(default)]
    pub confidence_bias: ConfidenceBias,
    #[serde(default)]
    pub keywords: String,
}

impl Query {
    /// Create a query with default preferences.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            source_preference: SourcePreference::default(),
            confidence_bias: ConfidenceBias::default(),
            keywords: String::new(),
        }
    }

    /// Set the source preference
    pub fn with_source(mut self, source: SourcePreference) -> Self {
        self.source_preference = source;
        self
    }

    /// Set the confidence bias
    pub fn with_bias(mut self, bias: ConfidenceBias) -> Self {
        self.confidence_bias = bias;
        self
    }

    /// Set the keyword focus
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    /// Build the instruction bundle for this query.
    pub fn instructions(&self) -> InstructionBundle {
        build(
            &self.question,
            self.source_preference,
            self.confidence_bias,
            &self.keywords,
        )
    }
}

/// Instruction fragments produced for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionBundle {
    pub question: String,
    pub source: &'static str,
    pub confidence: &'static str,
    /// Empty when no keywords were given.
    pub keywords: String,
}

impl InstructionBundle {
    /// Render the bundle as the user prompt: the question followed by each
    /// non-empty directive on its own line.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!("Question: {}\n\n{}\n{}", self.question, self.source, self.confidence);
        if !self.keywords.is_empty() {
            prompt.push('\n');
            prompt.push_str(&self.keywords);
        }
        prompt
    }
}

/// Build the keyword directive; empty when `keywords` is blank.
pub fn keyword_directive(keywords: &str) -> String {
    let trimmed = keywords.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!(
        "Focus your web search on these specific keywords/topics: \"{}\". Use these to find more targeted and relevant information.",
        trimmed
    )
}

/// Build the instruction bundle for a question and its preferences.
pub fn build(
    question: &str,
    source_preference: SourcePreference,
    confidence_bias: ConfidenceBias,
    keywords: &str,
) -> InstructionBundle {
    InstructionBundle {
        question: question.trim().to_string(),
        source: source_preference.instruction(),
        confidence: confidence_bias.instruction(),
        keywords: keyword_directive(keywords),
    }
}
