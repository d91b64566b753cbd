//! Durable audit trail of execution attempts

mod entry;
mod governance;
mod log;
mod report;

pub use entry::AuditEntry;
pub use governance::{
    AUDIT_RETENTION_DAYS, AuditTrail, DataSources, GovernanceReport, ModeComparison,
    VerifiedMetrics,
};
pub use log::AuditLog;
pub use report::{AuditSummary, ComplianceReport};
