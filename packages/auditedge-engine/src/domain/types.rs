use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// The three fixed section tags of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    AuditReport,
    MetricScores,
    Suggestions,
}

impl SectionKind {
    /// Canonical order, as requested from the model and rendered to users.
    pub const ALL: [SectionKind; 3] = [
        SectionKind::AuditReport,
        SectionKind::MetricScores,
        SectionKind::Suggestions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::AuditReport => "Audit Report",
            SectionKind::MetricScores => "Metric Scores",
            SectionKind::Suggestions => "Suggestions for Improvement",
        }
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown section: {}", s))
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a scored metric.
///
/// Names outside the requested set are kept verbatim in `Other`; they are presentation data
/// and never a reason to reject a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricName {
    Security,
    Performance,
    GasEfficiency,
    CodeQuality,
    Documentation,
    OtherKeyAreas,
    Other(String),
}

impl MetricName {
    /// Metrics the prompt asks the model to score, in order.
    pub const REQUESTED: [MetricName; 6] = [
        MetricName::Security,
        MetricName::Performance,
        MetricName::OtherKeyAreas,
        MetricName::GasEfficiency,
        MetricName::CodeQuality,
        MetricName::Documentation,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MetricName::Security => "Security",
            MetricName::Performance => "Performance",
            MetricName::GasEfficiency => "Gas Efficiency",
            MetricName::CodeQuality => "Code Quality",
            MetricName::Documentation => "Documentation",
            MetricName::OtherKeyAreas => "Other Key Areas",
            MetricName::Other(name) => name,
        }
    }
}

impl From<&str> for MetricName {
    fn from(name: &str) -> Self {
        let name = name.trim();
        MetricName::REQUESTED
            .into_iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| MetricName::Other(name.to_string()))
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MetricName::from(name.as_str()))
    }
}

/// Priority of an improvement suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "Low Priority")]
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High Priority",
            Priority::Medium => "Medium Priority",
            Priority::Low => "Low Priority",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Exact match on one of the four labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| format!("unknown priority: {}", s))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub metric: MetricName,
    /// Score in `[0, 10]`, or `None` when the model did not give a usable number.
    pub score: Option<f64>,
}

impl MetricScore {
    pub fn new(metric: MetricName, score: Option<f64>) -> Self {
        Self { metric, score }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub priority: Priority,
    pub suggestion: String,
}

impl Suggestion {
    pub fn new(priority: Priority, suggestion: impl Into<String>) -> Self {
        Self {
            priority,
            suggestion: suggestion.into(),
        }
    }
}

/// One tagged section of an audit, serialized as `{"section": <tag>, "details": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "details")]
pub enum AuditSection {
    #[serde(rename = "Audit Report")]
    AuditReport(String),
    #[serde(rename = "Metric Scores")]
    MetricScores(Vec<MetricScore>),
    #[serde(rename = "Suggestions for Improvement")]
    Suggestions(Vec<Suggestion>),
}

impl AuditSection {
    pub fn kind(&self) -> SectionKind {
        match self {
            AuditSection::AuditReport(_) => SectionKind::AuditReport,
            AuditSection::MetricScores(_) => SectionKind::MetricScores,
            AuditSection::Suggestions(_) => SectionKind::Suggestions,
        }
    }
}

/// A validated audit: exactly one section per tag.
///
/// Holding each section in its own field makes tag uniqueness hold by construction. The
/// serialized form is the three-element section array, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditResult {
    pub report: String,
    pub metrics: Vec<MetricScore>,
    pub suggestions: Vec<Suggestion>,
}

impl AuditResult {
    pub fn new(report: String, metrics: Vec<MetricScore>, suggestions: Vec<Suggestion>) -> Self {
        Self {
            report,
            metrics,
            suggestions,
        }
    }

    /// Placeholder a presenter can show after a failed analysis. The pipeline itself never
    /// returns it as a success.
    pub fn failure_placeholder() -> Self {
        Self::new(
            "Failed to analyze the contract due to an error.".to_string(),
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn sections(&self) -> [AuditSection; 3] {
        [
            AuditSection::AuditReport(self.report.clone()),
            AuditSection::MetricScores(self.metrics.clone()),
            AuditSection::Suggestions(self.suggestions.clone()),
        ]
    }

    pub fn metric(&self, name: &MetricName) -> Option<&MetricScore> {
        self.metrics.iter().find(|m| &m.metric == name)
    }

    pub fn suggestions_with(&self, priority: Priority) -> impl Iterator<Item = &Suggestion> {
        self.suggestions
            .iter()
            .filter(move |s| s.priority == priority)
    }
}

impl Serialize for AuditResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sections().serialize(serializer)
    }
}
