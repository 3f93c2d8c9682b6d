use serde::Serialize;

use crate::domain::assignment::AssignmentDecision;
use crate::domain::lead::Lead;

/// Outcome of an assignment request together with the lead as it stands.
#[derive(Debug, Serialize)]
pub struct LeadAssignment {
    pub decision: AssignmentDecision,
    pub lead: Lead,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows stored.
    pub imported: usize,
}
