//! Structured analysis records.
//!
//! [`AnalysisReport`] is the shape the model is asked to return;
//! [`AnalysisResult`] is that report once the normalizer has validated it and
//! stamped an id and timestamp. Neither is mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the event has already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Resolved,
    Pending,
}

/// Model's self-reported confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// How a scenario list should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioType {
    /// Several parties competing for one outcome.
    Competitors,
    /// Dates or windows in which the event may happen.
    Timeline,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Resolved => write!(f, "resolved"),
            EventStatus::Pending => write!(f, "pending"),
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}

/// One outcome in a multi-scenario analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub probability: f64,
    pub explanation: String,
}

/// A person whose public stance was weighed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influencer {
    pub name: String,
    pub stance: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Social sentiment breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSignals {
    pub overall_sentiment: String,
    pub summary: String,
    pub key_influencers: Vec<Influencer>,
}

/// A source the model drew a data point from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSource {
    pub name: String,
    pub url: String,
    pub data_point: String,
}

/// The structured answer as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub reframed_question: String,
    pub status: EventStatus,
    pub confidence_level: ConfidenceLevel,
    pub probability_low: f64,
    pub probability_high: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<Scenario>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_type: Option<ScenarioType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_outcome: Option<String>,
    pub system_decision: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_analysis: Option<String>,
    pub corporate_signals: Vec<String>,
    pub social_signals: SocialSignals,
    pub sources: Vec<AnalysisSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<String>,
}

/// A validated report with identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

impl AnalysisResult {
    pub fn is_resolved(&self) -> bool {
        self.report.status == EventStatus::Resolved
    }

    pub fn has_scenarios(&self) -> bool {
        self.report
            .scenarios
            .as_ref()
            .is_some_and(|s| !s.is_empty())
    }

    pub fn is_competitor_view(&self) -> bool {
        self.report.scenario_type == Some(ScenarioType::Competitors)
    }

    /// Scenarios by descending probability. Ties keep their original order.
    pub fn sorted_scenarios(&self) -> Vec<&Scenario> {
        let mut sorted: Vec<&Scenario> = self.report.scenarios.iter().flatten().collect();
        // sort_by is stable
        sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        sorted
    }

    /// The most likely scenario, if any.
    pub fn winner(&self) -> Option<&Scenario> {
        self.sorted_scenarios().into_iter().next()
    }
}
