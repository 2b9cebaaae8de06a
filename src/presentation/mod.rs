//! Plain-text rendering for the command-line shell.
//!
//! Every renderer returns a `String`; printing is left to the binary.

use crate::analysis::{AnalysisResult, ConfidenceLevel};
use crate::conversation::{ConversationTurn, Role};
use crate::history::HistoryEntry;
use crate::prompts::DISCLAIMER_TEXT;

/// Characters of a resolved outcome shown in the history list.
pub const OUTCOME_PREVIEW_CHARS: usize = 50;

/// Scenarios shown in the comparison block before collapsing the rest.
const SCENARIO_PREVIEW: usize = 2;

const RULE: &str = "------------------------------------------------------------";

/// Midpoint of the probability range, rounded half away from zero.
pub fn average_probability(result: &AnalysisResult) -> u32 {
    let avg = (result.report.probability_low + result.report.probability_high) / 2.0;
    avg.round().clamp(0.0, 100.0) as u32
}

/// Header badges in display order.
pub fn badges(result: &AnalysisResult) -> Vec<String> {
    let mut badges = vec![format!("{} Confidence", confidence_label(result.report.confidence_level))];

    if result.is_resolved() {
        badges.push("Resolved Event".to_string());
    } else if result.has_scenarios() {
        if result.is_competitor_view() {
            badges.push("Head-to-Head".to_string());
        } else {
            badges.push("Multi-Scenario".to_string());
        }
    }
    badges
}

fn confidence_label(level: ConfidenceLevel) -> &'static str {
    match level {
        ConfidenceLevel::Low => "Low",
        ConfidenceLevel::Medium => "Medium",
        ConfidenceLevel::High => "High",
    }
}

/// Render a full analysis card.
pub fn render_analysis(result: &AnalysisResult) -> String {
    let report = &result.report;
    let mut lines = Vec::new();

    lines.push(badges(result).iter().map(|b| format!("[{b}]")).collect::<Vec<_>>().join(" "));
    lines.push(report.reframed_question.clone());
    lines.push(RULE.to_string());

    if result.is_resolved() {
        lines.push("Confirmed Outcome".to_string());
        lines.push(format!(
            "  {}",
            report.resolved_outcome.as_deref().unwrap_or("Event Concluded")
        ));
    } else if result.is_competitor_view() && result.has_scenarios() {
        let sorted = result.sorted_scenarios();
        if let Some(winner) = sorted.first() {
            lines.push("Predicted Winner".to_string());
            lines.push(format!("  {} ({}%)", winner.name, winner.probability));
            let rest: Vec<String> = sorted[1..]
                .iter()
                .map(|s| format!("{} ({}%)", s.name, s.probability))
                .collect();
            if !rest.is_empty() {
                lines.push(format!("  vs {}", rest.join(", ")));
            }
        }
    } else if result.has_scenarios() {
        let sorted = result.sorted_scenarios();
        lines.push("Scenario Comparison".to_string());
        for (idx, scenario) in sorted.iter().take(SCENARIO_PREVIEW).enumerate() {
            let marker = if idx == 0 { "*" } else { " " };
            lines.push(format!(
                "{marker} {:>3}%  {}: {}",
                scenario.probability, scenario.name, scenario.explanation
            ));
        }
        if sorted.len() > SCENARIO_PREVIEW {
            lines.push(format!(
                "  and {} more scenarios...",
                sorted.len() - SCENARIO_PREVIEW
            ));
        }
    } else {
        lines.push(format!(
            "Probability: {}% ({}% - {}%)",
            average_probability(result),
            report.probability_low,
            report.probability_high
        ));
    }

    if let Some(remaining) = &report.time_remaining {
        lines.push(format!("{remaining} remaining"));
    }

    lines.push(String::new());
    lines.push("AI Prediction / Decision".to_string());
    lines.push(format!("  {}", report.system_decision));
    lines.push(String::new());
    lines.push(report.explanation.clone());

    if let Some(timeline) = &report.timeline_analysis {
        lines.push(String::new());
        lines.push("Timeline Analysis".to_string());
        lines.push(format!("  {timeline}"));
    }

    if !report.corporate_signals.is_empty() {
        lines.push(String::new());
        lines.push("Corporate Signals".to_string());
        lines.extend(report.corporate_signals.iter().map(|s| format!("  - {s}")));
    }

    let social = &report.social_signals;
    lines.push(String::new());
    lines.push("Social Signal Analysis".to_string());
    lines.push(format!("  Overall Sentiment: {}", social.overall_sentiment));
    lines.push(format!("  {}", social.summary));
    for influencer in &social.key_influencers {
        let mut line = format!(
            "  - {} ({}): \"{}\"",
            influencer.name, influencer.stance, influencer.statement
        );
        if let Some(url) = &influencer.source_url {
            line.push_str(&format!(" <{url}>"));
        }
        lines.push(line);
    }

    if !report.sources.is_empty() {
        lines.push(String::new());
        lines.push("Sources".to_string());
        lines.extend(
            report
                .sources
                .iter()
                .map(|s| format!("  - {}: {} <{}>", s.name, s.data_point, s.url)),
        );
    }

    lines.push(String::new());
    lines.push(DISCLAIMER_TEXT.to_string());
    lines.join("\n")
}

/// Render one chat turn, with its sources if any.
pub fn render_turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        Role::User => "You",
        Role::Model => "Compass",
        Role::System => "System",
    };

    let mut out = format!("{speaker}: {}", turn.content);
    let sources = turn.sources();
    if !sources.is_empty() {
        out.push_str("\n\nVERIFIED SOURCES");
        for (idx, source) in sources.iter().enumerate() {
            out.push_str(&format!("\n  [{}] {} <{}>", idx + 1, source.title, source.uri));
        }
    }
    out
}

/// One line per history entry, newest first as given.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history yet.".to_string();
    }
    entries
        .iter()
        .map(render_history_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary line for one history entry.
pub fn render_history_line(entry: &HistoryEntry) -> String {
    let date = entry.timestamp().format("%Y-%m-%d %H:%M");
    match entry {
        HistoryEntry::Analysis(result) => {
            let detail = if result.is_resolved() {
                let outcome = result.report.resolved_outcome.as_deref().unwrap_or_default();
                let preview: String = outcome.chars().take(OUTCOME_PREVIEW_CHARS).collect();
                format!("Resolved: {preview}...")
            } else {
                format!(
                    "{}% - {}%",
                    result.report.probability_low, result.report.probability_high
                )
            };
            format!(
                "{date}  {}  [analysis] {} | {detail}",
                entry.id(),
                result.report.reframed_question
            )
        }
        HistoryEntry::Conversation(record) => format!(
            "{date}  {}  [chat] {} | {}",
            entry.id(),
            record.query,
            record.summary
        ),
    }
}

/// Full replay of a history entry.
pub fn render_entry(entry: &HistoryEntry) -> String {
    match entry {
        HistoryEntry::Analysis(result) => render_analysis(result),
        HistoryEntry::Conversation(record) => {
            let mut parts: Vec<String> = record.turns.iter().map(render_turn).collect();
            parts.push(DISCLAIMER_TEXT.to_string());
            parts.join("\n\n")
        }
    }
}
