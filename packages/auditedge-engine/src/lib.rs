pub mod agents;
pub mod auditor;
pub mod config;
pub mod domain;
pub mod error;
pub mod normalizer;
pub mod prompt;
pub mod retry;

pub use auditor::{Auditor, analyze};
pub use domain::{AuditResult, AuditSection, MetricName, MetricScore, Priority, SectionKind, Suggestion};
pub use error::AuditError;
