use serde::Serialize;

use crate::domain::process::{AuditLogEntry, ProcessExecution, ProcessStep};

/// An execution with its step records and full audit trail.
#[derive(Debug, Serialize)]
pub struct ExecutionDetail {
    pub execution: ProcessExecution,
    pub steps: Vec<ProcessStep>,
    pub audit_log: Vec<AuditLogEntry>,
}

/// An open step past its due date.
#[derive(Debug, Serialize)]
pub struct OverdueStep {
    pub execution: ProcessExecution,
    pub step: ProcessStep,
}
