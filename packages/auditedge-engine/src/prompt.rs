//! Audit prompt construction.
//!
//! The output schema is rendered from the domain enums so the prompt and the normalizer can
//! never disagree about section tags, metric names or priority labels.

use crate::domain::{MetricName, Priority, SectionKind};
use serde_json::{Value, json};

const ROLE: &str = "You are an AI smart contract auditor. Your goal is to perform a thorough \
audit of the smart contract below, covering security, performance, gas efficiency, code \
quality, documentation and any other relevant aspect.";

/// Builds the instruction string for one audit. Pure: the same contract text always yields
/// the same prompt. The source is embedded verbatim and never validated.
pub fn build_prompt(contract: &str) -> String {
    let priorities = Priority::ALL
        .iter()
        .map(Priority::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{role}\n\n\
         Here is the smart contract:\n\
         ----- BEGIN CONTRACT -----\n\
         {contract}\n\
         ----- END CONTRACT -----\n\n\
         Return the results as a JSON array with exactly this structure:\n\
         {schema:#}\n\n\
         Rules:\n\
         - Return exactly three objects, one per section, in the order shown.\n\
         - Every \"score\" is a number from 0 to 10.\n\
         - Every \"priority\" is exactly one of: {priorities}.\n\
         - The \"{suggestions}\" details are an array of objects, never a single string.\n\
         - Respond with raw JSON only, without markdown or code block formatting and without \
         any text before or after the array.",
        role = ROLE,
        contract = contract,
        schema = output_schema(),
        priorities = priorities,
        suggestions = SectionKind::Suggestions.as_str(),
    )
}

fn output_schema() -> Value {
    let metrics: Vec<Value> = MetricName::REQUESTED
        .iter()
        .map(|metric| json!({ "metric": metric.as_str(), "score": "0-10" }))
        .collect();
    let priority_choices = Priority::ALL
        .iter()
        .map(Priority::as_str)
        .collect::<Vec<_>>()
        .join("|");

    json!([
        {
            "section": SectionKind::AuditReport.as_str(),
            "details": "A detailed audit report of the smart contract, covering security, performance, and any other relevant aspects."
        },
        {
            "section": SectionKind::MetricScores.as_str(),
            "details": metrics
        },
        {
            "section": SectionKind::Suggestions.as_str(),
            "details": [
                {
                    "priority": priority_choices,
                    "suggestion": "A specific suggestion for improving the smart contract."
                }
            ]
        }
    ])
}
