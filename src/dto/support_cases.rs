use serde::Serialize;

use crate::domain::support_case::Escalation;

/// Result of one breach sweep.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Breached cases inspected.
    pub breached: usize,
    pub escalations: Vec<Escalation>,
}
