//! Linear process engine.
//!
//! A definition is an ordered list of step descriptors. An execution walks
//! the list with an integer cursor (`current_step`): executing the next step
//! creates a step record for the cursor position, completing it advances the
//! cursor. Steps may require an approval before work starts. Every transition
//! is planned here as a [`ProcessTransition`] value carrying exactly one audit
//! entry; persisting it atomically is the repository's job.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::types::{
    MemberId, Notes, ProcessApprovalId, ProcessAuditLogId, ProcessDefinitionId,
    ProcessExecutionId, ProcessName, ProcessStepId, RoleName, StepName, TeamId, label_enum,
};

label_enum!(ExecutionStatus, "State of a process execution.", {
    Pending => "pending",
    Active => "active",
    AwaitingApproval => "awaiting_approval",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl ExecutionStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

label_enum!(StepStatus, "State of an executed step.", {
    InProgress => "in_progress",
    AwaitingApproval => "awaiting_approval",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl StepStatus {
    pub const fn is_open(self) -> bool {
        matches!(self, StepStatus::InProgress | StepStatus::AwaitingApproval)
    }
}

label_enum!(ApprovalStatus, "Decision state of a step approval.", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

label_enum!(AuditAction, "Kind of transition recorded in the audit log.", {
    Started => "started",
    StepStarted => "step_started",
    ApprovalGranted => "approval_granted",
    ApprovalRejected => "approval_rejected",
    StepCompleted => "step_completed",
    StepFailed => "step_failed",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// One entry of a definition's ordered step list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepDescriptor {
    pub name: StepName,
    #[serde(default)]
    pub requires_approval: bool,
    /// Hours allowed for the step once started.
    #[serde(default)]
    pub sla_hours: Option<i64>,
    /// Extra role an approver must hold for this step.
    #[serde(default)]
    pub approver_role: Option<RoleName>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessDefinition {
    pub id: ProcessDefinitionId,
    pub team_id: TeamId,
    pub name: ProcessName,
    pub steps: Vec<StepDescriptor>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProcessDefinition {
    pub fn step(&self, index: i32) -> Option<&StepDescriptor> {
        usize::try_from(index).ok().and_then(|i| self.steps.get(i))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewProcessDefinition {
    pub team_id: TeamId,
    pub name: ProcessName,
    pub steps: Vec<StepDescriptor>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessExecution {
    pub id: ProcessExecutionId,
    pub team_id: TeamId,
    pub definition_id: ProcessDefinitionId,
    pub status: ExecutionStatus,
    /// Index of the next step to execute.
    pub current_step: i32,
    pub started_by: MemberId,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug)]
pub struct NewProcessExecution {
    pub team_id: TeamId,
    pub definition_id: ProcessDefinitionId,
    pub started_by: MemberId,
    pub started_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessStep {
    pub id: ProcessStepId,
    pub execution_id: ProcessExecutionId,
    pub step_index: i32,
    pub name: StepName,
    pub status: StepStatus,
    pub requires_approval: bool,
    pub due_at: Option<NaiveDateTime>,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub notes: Option<Notes>,
}

impl ProcessStep {
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status.is_open() && self.due_at.is_some_and(|due| due < now)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProcessStep {
    pub step_index: i32,
    pub name: StepName,
    pub status: StepStatus,
    pub requires_approval: bool,
    pub due_at: Option<NaiveDateTime>,
    pub started_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessApproval {
    pub id: ProcessApprovalId,
    pub execution_id: ProcessExecutionId,
    pub step_id: ProcessStepId,
    pub status: ApprovalStatus,
    pub requested_at: NaiveDateTime,
    pub decided_by: Option<MemberId>,
    pub decided_at: Option<NaiveDateTime>,
    pub comment: Option<Notes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: ProcessAuditLogId,
    pub execution_id: ProcessExecutionId,
    pub action: AuditAction,
    pub actor_id: Option<MemberId>,
    pub details: Value,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub actor_id: Option<MemberId>,
    pub details: Value,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    pub current_step: i32,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepChange {
    Unchanged,
    Insert(NewProcessStep),
    Update {
        step_id: ProcessStepId,
        status: StepStatus,
        completed_at: Option<NaiveDateTime>,
        notes: Option<Notes>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApprovalChange {
    Unchanged,
    /// Pending approval for the step inserted by the same transition.
    Request { requested_at: NaiveDateTime },
    Decide {
        approval_id: ProcessApprovalId,
        status: ApprovalStatus,
        decided_by: MemberId,
        decided_at: NaiveDateTime,
        comment: Option<Notes>,
    },
}

/// Every row change of one engine transition.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessTransition {
    pub execution_id: ProcessExecutionId,
    pub execution: ExecutionUpdate,
    pub step: StepChange,
    pub approval: ApprovalChange,
    pub audit: NewAuditEntry,
}

/// Rows as they stand after a transition was applied.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AppliedTransition {
    pub execution: ProcessExecution,
    pub step: Option<ProcessStep>,
    pub approval: Option<ProcessApproval>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("process definition is inactive")]
    InactiveDefinition,
    #[error("process definition has no steps")]
    EmptyDefinition,
    #[error("definition does not belong to this execution")]
    DefinitionMismatch,
    #[error("execution is {actual}, expected {expected}")]
    UnexpectedStatus {
        expected: ExecutionStatus,
        actual: ExecutionStatus,
    },
    #[error("execution is already {0}")]
    Terminal(ExecutionStatus),
    #[error("no steps remain to execute")]
    NoRemainingSteps,
    #[error("step does not belong to this execution")]
    ForeignStep,
    #[error("step {step_index} is not the current step {current_step}")]
    StepNotCurrent { step_index: i32, current_step: i32 },
    #[error("step is {0}")]
    StepNotOpen(StepStatus),
    #[error("approval is already {0}")]
    ApprovalDecided(ApprovalStatus),
    #[error("step SLA of {0} hours puts the due date out of range")]
    DueDateOutOfRange(i64),
}

impl NewProcessExecution {
    /// Validates the definition and plans the initial execution row.
    pub fn start(
        definition: &ProcessDefinition,
        actor: MemberId,
        now: NaiveDateTime,
    ) -> Result<(Self, NewAuditEntry), ProcessError> {
        if !definition.is_active {
            return Err(ProcessError::InactiveDefinition);
        }
        if definition.steps.is_empty() {
            return Err(ProcessError::EmptyDefinition);
        }

        let execution = Self {
            team_id: definition.team_id,
            definition_id: definition.id,
            started_by: actor,
            started_at: now,
        };
        let audit = NewAuditEntry {
            action: AuditAction::Started,
            actor_id: Some(actor),
            details: json!({
                "definition_id": definition.id.get(),
                "definition": definition.name.as_str(),
                "steps": definition.steps.len(),
            }),
            created_at: now,
        };
        Ok((execution, audit))
    }
}

impl ProcessExecution {
    fn expect_status(&self, expected: ExecutionStatus) -> Result<(), ProcessError> {
        if self.status.is_terminal() && self.status != expected {
            return Err(ProcessError::Terminal(self.status));
        }
        if self.status != expected {
            return Err(ProcessError::UnexpectedStatus {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    fn expect_definition(&self, definition: &ProcessDefinition) -> Result<(), ProcessError> {
        if definition.id != self.definition_id {
            return Err(ProcessError::DefinitionMismatch);
        }
        Ok(())
    }

    fn expect_current(&self, step: &ProcessStep) -> Result<(), ProcessError> {
        if step.execution_id != self.id {
            return Err(ProcessError::ForeignStep);
        }
        if step.step_index != self.current_step {
            return Err(ProcessError::StepNotCurrent {
                step_index: step.step_index,
                current_step: self.current_step,
            });
        }
        Ok(())
    }

    fn audit(
        action: AuditAction,
        actor: MemberId,
        details: Value,
        now: NaiveDateTime,
    ) -> NewAuditEntry {
        NewAuditEntry {
            action,
            actor_id: Some(actor),
            details,
            created_at: now,
        }
    }

    /// Creates the record for the step at the cursor.
    pub fn plan_next_step(
        &self,
        definition: &ProcessDefinition,
        actor: MemberId,
        now: NaiveDateTime,
    ) -> Result<ProcessTransition, ProcessError> {
        self.expect_definition(definition)?;
        self.expect_status(ExecutionStatus::Pending)?;
        let descriptor = definition
            .step(self.current_step)
            .ok_or(ProcessError::NoRemainingSteps)?;

        let due_at = descriptor
            .sla_hours
            .map(|hours| {
                Duration::try_hours(hours)
                    .and_then(|sla| now.checked_add_signed(sla))
                    .ok_or(ProcessError::DueDateOutOfRange(hours))
            })
            .transpose()?;
        let (step_status, execution_status, approval) = if descriptor.requires_approval {
            (
                StepStatus::AwaitingApproval,
                ExecutionStatus::AwaitingApproval,
                ApprovalChange::Request { requested_at: now },
            )
        } else {
            (
                StepStatus::InProgress,
                ExecutionStatus::Active,
                ApprovalChange::Unchanged,
            )
        };

        Ok(ProcessTransition {
            execution_id: self.id,
            execution: ExecutionUpdate {
                status: execution_status,
                current_step: self.current_step,
                completed_at: None,
            },
            step: StepChange::Insert(NewProcessStep {
                step_index: self.current_step,
                name: descriptor.name.clone(),
                status: step_status,
                requires_approval: descriptor.requires_approval,
                due_at,
                started_at: now,
            }),
            approval,
            audit: Self::audit(
                AuditAction::StepStarted,
                actor,
                json!({
                    "step_index": self.current_step,
                    "step": descriptor.name.as_str(),
                    "requires_approval": descriptor.requires_approval,
                    "due_at": due_at,
                }),
                now,
            ),
        })
    }

    /// Marks the current step done and advances the cursor.
    pub fn plan_step_completion(
        &self,
        definition: &ProcessDefinition,
        step: &ProcessStep,
        actor: MemberId,
        now: NaiveDateTime,
        notes: Option<Notes>,
    ) -> Result<ProcessTransition, ProcessError> {
        self.expect_definition(definition)?;
        self.expect_status(ExecutionStatus::Active)?;
        self.expect_current(step)?;
        if step.status != StepStatus::InProgress {
            return Err(ProcessError::StepNotOpen(step.status));
        }

        let next_step = self.current_step + 1;
        let finished = usize::try_from(next_step).is_ok_and(|n| n >= definition.steps.len());
        let (status, completed_at, action) = if finished {
            (ExecutionStatus::Completed, Some(now), AuditAction::Completed)
        } else {
            (ExecutionStatus::Pending, None, AuditAction::StepCompleted)
        };

        Ok(ProcessTransition {
            execution_id: self.id,
            execution: ExecutionUpdate {
                status,
                current_step: next_step,
                completed_at,
            },
            step: StepChange::Update {
                step_id: step.id,
                status: StepStatus::Completed,
                completed_at: Some(now),
                notes: notes.clone(),
            },
            approval: ApprovalChange::Unchanged,
            audit: Self::audit(
                action,
                actor,
                json!({
                    "step_index": step.step_index,
                    "step": step.name.as_str(),
                    "notes": notes.as_ref().map(Notes::as_str),
                }),
                now,
            ),
        })
    }

    /// Closes the pending approval of `step`, if any, as part of another
    /// transition.
    fn withdraw_approval(
        step: &ProcessStep,
        approval: Option<&ProcessApproval>,
        actor: MemberId,
        now: NaiveDateTime,
        comment: Option<Notes>,
    ) -> ApprovalChange {
        match approval {
            Some(approval)
                if approval.step_id == step.id && approval.status == ApprovalStatus::Pending =>
            {
                ApprovalChange::Decide {
                    approval_id: approval.id,
                    status: ApprovalStatus::Cancelled,
                    decided_by: actor,
                    decided_at: now,
                    comment,
                }
            }
            _ => ApprovalChange::Unchanged,
        }
    }

    /// Fails the open step and with it the whole execution. A pending
    /// approval on the step is cancelled.
    pub fn plan_step_failure(
        &self,
        step: &ProcessStep,
        approval: Option<&ProcessApproval>,
        actor: MemberId,
        now: NaiveDateTime,
        reason: Option<Notes>,
    ) -> Result<ProcessTransition, ProcessError> {
        if self.status.is_terminal() {
            return Err(ProcessError::Terminal(self.status));
        }
        self.expect_current(step)?;
        if !step.status.is_open() {
            return Err(ProcessError::StepNotOpen(step.status));
        }

        Ok(ProcessTransition {
            execution_id: self.id,
            execution: ExecutionUpdate {
                status: ExecutionStatus::Failed,
                current_step: self.current_step,
                completed_at: Some(now),
            },
            step: StepChange::Update {
                step_id: step.id,
                status: StepStatus::Failed,
                completed_at: Some(now),
                notes: reason.clone(),
            },
            approval: Self::withdraw_approval(step, approval, actor, now, reason.clone()),
            audit: Self::audit(
                AuditAction::StepFailed,
                actor,
                json!({
                    "step_index": step.step_index,
                    "step": step.name.as_str(),
                    "reason": reason.as_ref().map(Notes::as_str),
                }),
                now,
            ),
        })
    }

    /// Applies an approver's decision on the step awaiting approval.
    pub fn plan_approval_decision(
        &self,
        step: &ProcessStep,
        approval: &ProcessApproval,
        decision: ApprovalDecision,
        actor: MemberId,
        now: NaiveDateTime,
        comment: Option<Notes>,
    ) -> Result<ProcessTransition, ProcessError> {
        self.expect_status(ExecutionStatus::AwaitingApproval)?;
        self.expect_current(step)?;
        if approval.step_id != step.id {
            return Err(ProcessError::ForeignStep);
        }
        if approval.status != ApprovalStatus::Pending {
            return Err(ProcessError::ApprovalDecided(approval.status));
        }
        if step.status != StepStatus::AwaitingApproval {
            return Err(ProcessError::StepNotOpen(step.status));
        }

        let (approval_status, step_status, execution, action) = match decision {
            ApprovalDecision::Approve => (
                ApprovalStatus::Approved,
                StepStatus::InProgress,
                ExecutionUpdate {
                    status: ExecutionStatus::Active,
                    current_step: self.current_step,
                    completed_at: None,
                },
                AuditAction::ApprovalGranted,
            ),
            ApprovalDecision::Reject => (
                ApprovalStatus::Rejected,
                StepStatus::Failed,
                ExecutionUpdate {
                    status: ExecutionStatus::Failed,
                    current_step: self.current_step,
                    completed_at: Some(now),
                },
                AuditAction::ApprovalRejected,
            ),
        };

        Ok(ProcessTransition {
            execution_id: self.id,
            execution,
            step: StepChange::Update {
                step_id: step.id,
                status: step_status,
                completed_at: (step_status == StepStatus::Failed).then_some(now),
                notes: None,
            },
            approval: ApprovalChange::Decide {
                approval_id: approval.id,
                status: approval_status,
                decided_by: actor,
                decided_at: now,
                comment: comment.clone(),
            },
            audit: Self::audit(
                action,
                actor,
                json!({
                    "step_index": step.step_index,
                    "approval_id": approval.id.get(),
                    "comment": comment.as_ref().map(Notes::as_str),
                }),
                now,
            ),
        })
    }

    /// Stops a running execution. The open step at the cursor, if any, is
    /// cancelled with it, and so is its pending approval.
    pub fn plan_cancel(
        &self,
        open_step: Option<&ProcessStep>,
        approval: Option<&ProcessApproval>,
        actor: MemberId,
        now: NaiveDateTime,
        reason: Option<Notes>,
    ) -> Result<ProcessTransition, ProcessError> {
        if self.status.is_terminal() {
            return Err(ProcessError::Terminal(self.status));
        }

        let open_step = open_step.filter(|step| {
            step.execution_id == self.id
                && step.step_index == self.current_step
                && step.status.is_open()
        });
        let (step, approval) = match open_step {
            Some(step) => (
                StepChange::Update {
                    step_id: step.id,
                    status: StepStatus::Cancelled,
                    completed_at: Some(now),
                    notes: reason.clone(),
                },
                Self::withdraw_approval(step, approval, actor, now, reason.clone()),
            ),
            None => (StepChange::Unchanged, ApprovalChange::Unchanged),
        };

        Ok(ProcessTransition {
            execution_id: self.id,
            execution: ExecutionUpdate {
                status: ExecutionStatus::Cancelled,
                current_step: self.current_step,
                completed_at: Some(now),
            },
            step,
            approval,
            audit: Self::audit(
                AuditAction::Cancelled,
                actor,
                json!({ "reason": reason.as_ref().map(Notes::as_str) }),
                now,
            ),
        })
    }
}
