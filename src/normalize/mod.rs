//! Result normalizer.
//!
//! Shapes untrusted model output into the two fixed result types. The
//! structured parse fails closed: anything that does not validate becomes
//! [`AnalysisError::MalformedResponse`], never a default-filled record.

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::analysis::{AnalysisReport, AnalysisResult};
use crate::conversation::{ConversationTurn, Role};
use crate::error::{AnalysisError, AnalysisResultOf};
use crate::gateway::ModelReply;

/// Parse model text into an [`AnalysisResult`].
///
/// Accepts bare JSON, JSON inside a Markdown code fence, or a single JSON
/// object surrounded by prose.
pub fn parse_analysis(text: &str) -> AnalysisResultOf<AnalysisResult> {
    let report = parse_report(text).map_err(|e| {
        warn!(error = %e, "Structured response rejected");
        e
    })?;
    validate(&report)?;

    Ok(AnalysisResult {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        report,
    })
}

fn parse_report(text: &str) -> AnalysisResultOf<AnalysisReport> {
    let body = strip_code_fence(text.trim());

    match serde_json::from_str::<AnalysisReport>(body) {
        Ok(report) => Ok(report),
        Err(first) => match embedded_object(body) {
            Some(object) if object.len() < body.len() => serde_json::from_str(object)
                .map_err(|e| AnalysisError::malformed(e.to_string())),
            _ => Err(AnalysisError::malformed(first.to_string())),
        },
    }
}

/// Remove a surrounding ```json ... ``` fence if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // drop the info string ("json") on the opening line
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}

/// Slice from the first `{` to the last `}`.
fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn validate(report: &AnalysisReport) -> AnalysisResultOf<()> {
    let in_range = |p: f64| (0.0..=100.0).contains(&p);

    if !in_range(report.probability_low) || !in_range(report.probability_high) {
        return Err(AnalysisError::malformed(format!(
            "probability range {}-{} is outside 0-100",
            report.probability_low, report.probability_high
        )));
    }
    if report.probability_low > report.probability_high {
        return Err(AnalysisError::malformed(format!(
            "probability_low {} exceeds probability_high {}",
            report.probability_low, report.probability_high
        )));
    }
    if report.reframed_question.trim().is_empty() {
        return Err(AnalysisError::malformed("reframed_question is empty"));
    }
    Ok(())
}

/// Wrap a gateway reply as a `model` turn with fresh id and timestamp.
pub fn model_turn(reply: ModelReply) -> ConversationTurn {
    ConversationTurn::new(Role::Model, reply.text).with_sources(reply.sources)
}

/// A `user` turn for submitted text.
pub fn user_turn(text: impl Into<String>) -> ConversationTurn {
    ConversationTurn::new(Role::User, text)
}

/// A `system` turn for local notices.
pub fn system_turn(text: impl Into<String>) -> ConversationTurn {
    ConversationTurn::new(Role::System, text)
}
