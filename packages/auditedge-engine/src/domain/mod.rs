pub mod types;

pub use types::{AuditResult, AuditSection, MetricName, MetricScore, Priority, SectionKind, Suggestion};
