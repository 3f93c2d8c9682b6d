//! Support cases tracked against SLA due dates.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::sla::SlaPolicy;
use crate::domain::types::{
    CaseSubject, CompanyId, MemberId, Notes, SupportCaseId, TeamId, label_enum,
};

label_enum!(CasePriority, "Urgency of a support case.", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

label_enum!(CaseStatus, "Handling status of a support case.", {
    Open => "open",
    Pending => "pending",
    Resolved => "resolved",
    Closed => "closed",
});

impl CaseStatus {
    pub const FINISHED: &'static [CaseStatus] = &[CaseStatus::Resolved, CaseStatus::Closed];

    pub fn is_finished(self) -> bool {
        Self::FINISHED.contains(&self)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SupportCase {
    pub id: SupportCaseId,
    pub team_id: TeamId,
    pub company_id: Option<CompanyId>,
    pub subject: CaseSubject,
    pub description: Option<Notes>,
    pub priority: CasePriority,
    pub status: CaseStatus,
    pub assigned_to: Option<MemberId>,
    pub due_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub escalation_level: i32,
    pub escalated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl SupportCase {
    pub fn is_breached(&self, now: NaiveDateTime) -> bool {
        !self.status.is_finished() && self.due_at < now
    }

    /// New escalation level if the breach has crossed another threshold.
    ///
    /// Levels never decrease, so a relaxed policy leaves the stored level as is.
    pub fn next_escalation(&self, policy: &SlaPolicy, now: NaiveDateTime) -> Option<i32> {
        if !self.is_breached(now) {
            return None;
        }
        let level = policy.escalation_level(self.due_at, now);
        (level > self.escalation_level).then_some(level)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewSupportCase {
    pub team_id: TeamId,
    pub company_id: Option<CompanyId>,
    pub subject: CaseSubject,
    pub description: Option<Notes>,
    pub priority: CasePriority,
    pub assigned_to: Option<MemberId>,
    pub due_at: NaiveDateTime,
}

/// A case whose escalation level went up during a sweep.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Escalation {
    pub case_id: SupportCaseId,
    pub team_id: TeamId,
    pub previous_level: i32,
    pub level: i32,
}
