//! Turns raw model text into a validated [`AuditResult`].
//!
//! Shape deviations are rejected or recovered here and nowhere else. The only recovery that
//! downgrades a failure to a degraded result is [`recover_suggestions`].

use crate::domain::{AuditResult, MetricName, MetricScore, Priority, SectionKind, Suggestion};
use crate::error::AuditError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?").expect("valid fence pattern"));

static BOLD_SUGGESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(Critical|High Priority|Medium Priority|Low Priority):\*\* ([^*]+)")
        .expect("valid suggestion pattern")
});

static NUMERIC_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(?:/\s*10)?$").expect("valid score pattern")
});

pub const MAX_SCORE: f64 = 10.0;

/// Normalizes one raw completion.
pub fn normalize(raw: &str) -> Result<AuditResult, AuditError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| AuditError::malformed(format!("response is not valid JSON: {}", e), raw))?;

    let sections = index_sections(&value, raw)?;

    let report = parse_report(sections[&SectionKind::AuditReport], raw)?;
    let metrics = parse_metrics(sections[&SectionKind::MetricScores], raw)?;
    let suggestions = parse_suggestions(sections[&SectionKind::Suggestions], raw)?;

    debug!(
        metrics = metrics.len(),
        suggestions = suggestions.len(),
        "Normalized model response"
    );
    Ok(AuditResult::new(report, metrics, suggestions))
}

/// Removes markdown code fence markers (with or without a `json` tag) and surrounding
/// whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Maps each section tag to its `details` payload, enforcing exactly one entry per tag.
fn index_sections<'a>(
    value: &'a Value,
    raw: &str,
) -> Result<HashMap<SectionKind, &'a Value>, AuditError> {
    let entries = value
        .as_array()
        .ok_or_else(|| AuditError::malformed("expected a JSON array of sections", raw))?;

    let mut sections = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        let tag = entry
            .get("section")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AuditError::malformed(format!("entry {} has no \"section\" tag", index), raw)
            })?;
        let kind: SectionKind = tag
            .parse()
            .map_err(|e: String| AuditError::malformed(e, raw))?;
        let details = entry.get("details").unwrap_or(&Value::Null);

        if sections.insert(kind, details).is_some() {
            return Err(AuditError::malformed(
                format!("duplicate section: {}", kind),
                raw,
            ));
        }
    }

    if let Some(missing) = SectionKind::ALL
        .into_iter()
        .find(|kind| !sections.contains_key(kind))
    {
        return Err(AuditError::malformed(
            format!("missing section: {}", missing),
            raw,
        ));
    }

    Ok(sections)
}

fn parse_report(details: &Value, raw: &str) -> Result<String, AuditError> {
    match details {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(AuditError::malformed(
            format!("\"{}\" details must be text", SectionKind::AuditReport),
            raw,
        )),
    }
}

fn parse_metrics(details: &Value, raw: &str) -> Result<Vec<MetricScore>, AuditError> {
    let entries = details.as_array().ok_or_else(|| {
        AuditError::malformed(
            format!("\"{}\" details must be an array", SectionKind::MetricScores),
            raw,
        )
    })?;

    let mut metrics = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(name) = entry.get("metric").and_then(Value::as_str) else {
            warn!("Dropping metric entry without a name: {}", entry);
            continue;
        };
        let score = entry.get("score").and_then(coerce_score);
        if score.is_none() {
            debug!(metric = name, "Metric score is not numeric; treating as unknown");
        }
        metrics.push(MetricScore::new(MetricName::from(name), score));
    }
    Ok(metrics)
}

/// Coerces a numeric-like score into `[0, 10]`.
///
/// Accepts numbers and strings such as `"8"`, `"7.5"` or `"8/10"`. Out-of-range values are
/// clamped; anything else (including the `"0-10"` schema placeholder) is unknown.
pub fn coerce_score(value: &Value) -> Option<f64> {
    let number = match value {
        // Literals beyond f64 range (e.g. 1e400) parse to an infinity and clamp to a bound.
        Value::Number(n) => n.as_f64().or_else(|| n.to_string().parse::<f64>().ok())?,
        Value::String(s) => {
            let captures = NUMERIC_SCORE.captures(s.trim())?;
            captures[1].parse::<f64>().ok()?
        }
        _ => return None,
    };
    (!number.is_nan()).then(|| number.clamp(0.0, MAX_SCORE))
}

fn parse_suggestions(details: &Value, raw: &str) -> Result<Vec<Suggestion>, AuditError> {
    match details {
        Value::Array(entries) => Ok(entries.iter().filter_map(structured_suggestion).collect()),
        Value::String(text) => Ok(recover_suggestions(text)),
        _ => Err(AuditError::malformed(
            format!(
                "\"{}\" details must be an array or text",
                SectionKind::Suggestions
            ),
            raw,
        )),
    }
}

fn structured_suggestion(entry: &Value) -> Option<Suggestion> {
    let label = entry.get("priority").and_then(Value::as_str);
    let text = entry
        .get("suggestion")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match (label.map(str::parse::<Priority>), text) {
        (Some(Ok(priority)), Some(text)) => Some(Suggestion::new(priority, text)),
        _ => {
            warn!("Dropping malformed suggestion entry: {}", entry);
            None
        }
    }
}

/// Rebuilds structured suggestions from free text of the form `**<priority>:** <text>`.
///
/// Only the four priority labels are recognised. Text in any other format yields an empty
/// list rather than an error.
pub fn recover_suggestions(text: &str) -> Vec<Suggestion> {
    let suggestions: Vec<Suggestion> = BOLD_SUGGESTION
        .captures_iter(text)
        .filter_map(|caps| {
            let priority = caps[1].parse::<Priority>().ok()?;
            let suggestion = caps[2].trim();
            (!suggestion.is_empty()).then(|| Suggestion::new(priority, suggestion))
        })
        .collect();

    if suggestions.is_empty() {
        warn!("Suggestions arrived as free text without recognisable priorities; leaving them empty");
    } else {
        debug!(count = suggestions.len(), "Recovered suggestions from free text");
    }
    suggestions
}
