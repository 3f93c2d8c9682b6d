//! Diesel models for process definitions, executions and their history.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::process::{
    ApprovalStatus, AuditAction, AuditLogEntry, ExecutionStatus, NewAuditEntry,
    NewProcessDefinition as DomainNewProcessDefinition,
    NewProcessExecution as DomainNewProcessExecution, NewProcessStep as DomainNewProcessStep,
    ProcessApproval as DomainProcessApproval, ProcessDefinition as DomainProcessDefinition,
    ProcessExecution as DomainProcessExecution, ProcessStep as DomainProcessStep,
    StepDescriptor, StepStatus,
};
use crate::domain::types::{
    MemberId, Notes, ProcessApprovalId, ProcessAuditLogId, ProcessDefinitionId,
    ProcessExecutionId, ProcessName, ProcessStepId, StepName, TeamId, TypeConstraintError,
};
use crate::models::{from_json, optional_id, to_json};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::process_definitions)]
pub struct ProcessDefinition {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub steps: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::process_definitions)]
pub struct NewProcessDefinition<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub steps: String,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::process_executions)]
pub struct ProcessExecution {
    pub id: i32,
    pub team_id: i32,
    pub definition_id: i32,
    pub status: String,
    pub current_step: i32,
    pub started_by: i32,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::process_executions)]
pub struct NewProcessExecution<'a> {
    pub team_id: i32,
    pub definition_id: i32,
    pub status: &'a str,
    pub current_step: i32,
    pub started_by: i32,
    pub started_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::process_executions, treat_none_as_null = true)]
/// Columns an engine transition rewrites on the execution row.
pub struct ExecutionChange<'a> {
    pub status: &'a str,
    pub current_step: i32,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::process_steps)]
pub struct ProcessStep {
    pub id: i32,
    pub execution_id: i32,
    pub step_index: i32,
    pub name: String,
    pub status: String,
    pub requires_approval: bool,
    pub due_at: Option<NaiveDateTime>,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::process_steps)]
pub struct NewProcessStep<'a> {
    pub execution_id: i32,
    pub step_index: i32,
    pub name: &'a str,
    pub status: &'a str,
    pub requires_approval: bool,
    pub due_at: Option<NaiveDateTime>,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::process_approvals)]
pub struct ProcessApproval {
    pub id: i32,
    pub execution_id: i32,
    pub step_id: i32,
    pub status: String,
    pub requested_at: NaiveDateTime,
    pub decided_by: Option<i32>,
    pub decided_at: Option<NaiveDateTime>,
    pub comment: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::process_approvals)]
pub struct NewProcessApproval<'a> {
    pub execution_id: i32,
    pub step_id: i32,
    pub status: &'a str,
    pub requested_at: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::process_audit_logs)]
pub struct ProcessAuditLog {
    pub id: i32,
    pub execution_id: i32,
    pub action: String,
    pub actor_id: Option<i32>,
    pub details: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::process_audit_logs)]
pub struct NewProcessAuditLog<'a> {
    pub execution_id: i32,
    pub action: &'a str,
    pub actor_id: Option<i32>,
    pub details: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<ProcessDefinition> for DomainProcessDefinition {
    type Error = TypeConstraintError;

    fn try_from(definition: ProcessDefinition) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProcessDefinitionId::try_from(definition.id)?,
            team_id: TeamId::try_from(definition.team_id)?,
            name: ProcessName::new(definition.name)?,
            steps: from_json::<Vec<StepDescriptor>>(&definition.steps)?,
            is_active: definition.is_active,
            created_at: definition.created_at,
            updated_at: definition.updated_at,
        })
    }
}

impl<'a> TryFrom<&'a DomainNewProcessDefinition> for NewProcessDefinition<'a> {
    type Error = TypeConstraintError;

    fn try_from(definition: &'a DomainNewProcessDefinition) -> Result<Self, Self::Error> {
        Ok(Self {
            team_id: definition.team_id.get(),
            name: definition.name.as_str(),
            steps: to_json(&definition.steps)?,
        })
    }
}

impl TryFrom<ProcessExecution> for DomainProcessExecution {
    type Error = TypeConstraintError;

    fn try_from(execution: ProcessExecution) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProcessExecutionId::try_from(execution.id)?,
            team_id: TeamId::try_from(execution.team_id)?,
            definition_id: ProcessDefinitionId::try_from(execution.definition_id)?,
            status: ExecutionStatus::try_from(execution.status)?,
            current_step: execution.current_step,
            started_by: MemberId::try_from(execution.started_by)?,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
        })
    }
}

impl From<&DomainNewProcessExecution> for NewProcessExecution<'static> {
    fn from(execution: &DomainNewProcessExecution) -> Self {
        Self {
            team_id: execution.team_id.get(),
            definition_id: execution.definition_id.get(),
            status: ExecutionStatus::Pending.as_str(),
            current_step: 0,
            started_by: execution.started_by.get(),
            started_at: execution.started_at,
        }
    }
}

impl TryFrom<ProcessStep> for DomainProcessStep {
    type Error = TypeConstraintError;

    fn try_from(step: ProcessStep) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProcessStepId::try_from(step.id)?,
            execution_id: ProcessExecutionId::try_from(step.execution_id)?,
            step_index: step.step_index,
            name: StepName::new(step.name)?,
            status: StepStatus::try_from(step.status)?,
            requires_approval: step.requires_approval,
            due_at: step.due_at,
            started_at: step.started_at,
            completed_at: step.completed_at,
            notes: Notes::optional(step.notes),
        })
    }
}

impl<'a> NewProcessStep<'a> {
    pub fn new(execution_id: ProcessExecutionId, step: &'a DomainNewProcessStep) -> Self {
        Self {
            execution_id: execution_id.get(),
            step_index: step.step_index,
            name: step.name.as_str(),
            status: step.status.as_str(),
            requires_approval: step.requires_approval,
            due_at: step.due_at,
            started_at: step.started_at,
        }
    }
}

impl TryFrom<ProcessApproval> for DomainProcessApproval {
    type Error = TypeConstraintError;

    fn try_from(approval: ProcessApproval) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProcessApprovalId::try_from(approval.id)?,
            execution_id: ProcessExecutionId::try_from(approval.execution_id)?,
            step_id: ProcessStepId::try_from(approval.step_id)?,
            status: ApprovalStatus::try_from(approval.status)?,
            requested_at: approval.requested_at,
            decided_by: optional_id(approval.decided_by)?,
            decided_at: approval.decided_at,
            comment: Notes::optional(approval.comment),
        })
    }
}

impl TryFrom<ProcessAuditLog> for AuditLogEntry {
    type Error = TypeConstraintError;

    fn try_from(log: ProcessAuditLog) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProcessAuditLogId::try_from(log.id)?,
            execution_id: ProcessExecutionId::try_from(log.execution_id)?,
            action: AuditAction::try_from(log.action)?,
            actor_id: optional_id(log.actor_id)?,
            details: from_json(&log.details)?,
            created_at: log.created_at,
        })
    }
}

impl<'a> NewProcessAuditLog<'a> {
    pub fn new(
        execution_id: ProcessExecutionId,
        entry: &'a NewAuditEntry,
    ) -> Result<Self, TypeConstraintError> {
        Ok(Self {
            execution_id: execution_id.get(),
            action: entry.action.as_str(),
            actor_id: entry.actor_id.map(|id| id.get()),
            details: to_json(&entry.details)?,
            created_at: entry.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn step_descriptors_default_optional_keys() {
        let now = Utc::now().naive_utc();
        let row = ProcessDefinition {
            id: 1,
            team_id: 1,
            name: "Onboarding".into(),
            steps: r#"[{"name":"Kickoff"},{"name":"Sign-off","requires_approval":true,"approver_role":"finance"}]"#
                .into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let definition = DomainProcessDefinition::try_from(row).unwrap();
        assert_eq!(definition.steps.len(), 2);
        assert!(!definition.steps[0].requires_approval);
        assert_eq!(definition.steps[0].sla_hours, None);
        assert_eq!(
            definition.steps[1].approver_role.as_ref().map(|r| r.as_str()),
            Some("finance")
        );
    }

    #[test]
    fn new_executions_start_pending_at_first_step() {
        let domain = DomainNewProcessExecution {
            team_id: TeamId::new(1).unwrap(),
            definition_id: ProcessDefinitionId::new(2).unwrap(),
            started_by: MemberId::new(3).unwrap(),
            started_at: Utc::now().naive_utc(),
        };
        let new = NewProcessExecution::from(&domain);
        assert_eq!(new.status, "pending");
        assert_eq!(new.current_step, 0);
    }
}
