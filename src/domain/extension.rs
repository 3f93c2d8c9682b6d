//! Team-configured logic hooks bound to lifecycle events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::types::{ExtensionId, ExtensionName, HandlerKey, TeamId, label_enum};

label_enum!(HookEvent, "Lifecycle event an extension can subscribe to.", {
    LeadCreated => "lead_created",
    LeadAssigned => "lead_assigned",
    LeadConverted => "lead_converted",
    OpportunityStageChanged => "opportunity_stage_changed",
    CaseCreated => "case_created",
    CaseEscalated => "case_escalated",
    ProcessCompleted => "process_completed",
});

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Extension {
    pub id: ExtensionId,
    pub team_id: TeamId,
    pub name: ExtensionName,
    pub event: HookEvent,
    /// Key of the registered handler to run.
    pub handler: HandlerKey,
    /// Handler specific settings.
    pub config: Value,
    /// Lower values run first.
    pub priority: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewExtension {
    pub team_id: TeamId,
    pub name: ExtensionName,
    pub event: HookEvent,
    pub handler: HandlerKey,
    pub config: Value,
    pub priority: i32,
}
