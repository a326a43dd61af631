use auditedge_engine::{AuditResult, Priority, SectionKind};
use console::{StyledObject, style};
use std::fmt::Write;

pub fn render(result: &AuditResult) -> String {
    let mut out = String::new();

    heading(&mut out, SectionKind::AuditReport);
    let _ = writeln!(out, "{}", result.report);

    heading(&mut out, SectionKind::MetricScores);
    if result.metrics.is_empty() {
        let _ = writeln!(out, "  {}", style("No scores returned.").dim());
    }
    for metric in &result.metrics {
        let _ = writeln!(
            out,
            "  {}: {}/10",
            metric.metric,
            format_score(metric.score)
        );
    }

    heading(&mut out, SectionKind::Suggestions);
    if result.suggestions.is_empty() {
        let _ = writeln!(out, "  {}", style("No suggestions returned.").dim());
    }
    for priority in Priority::ALL {
        for suggestion in result.suggestions_with(priority) {
            let _ = writeln!(
                out,
                "  {} {}",
                priority_label(priority),
                suggestion.suggestion
            );
        }
    }

    out
}

fn heading(out: &mut String, kind: SectionKind) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{}", style(format!("{}:", kind)).bold().cyan());
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.fract() == 0.0 => format!("{}", s as u8),
        Some(s) => format!("{:.1}", s),
        None => "?".to_string(),
    }
}

fn priority_label(priority: Priority) -> StyledObject<String> {
    let label = format!("[{}]", priority);
    match priority {
        Priority::Critical => style(label).red().bold(),
        Priority::High => style(label).color256(208),
        Priority::Medium => style(label).yellow(),
        Priority::Low => style(label).green(),
    }
}
