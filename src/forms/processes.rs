//! Process definitions and the bodies of engine transitions.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    domain::{
        process::{ApprovalDecision, NewProcessDefinition, StepDescriptor},
        types::{Notes, ProcessName, RoleName, StepName, TeamId},
    },
    forms::{FormError, optional_text},
};

/// Ten years.
pub const MAX_STEP_SLA_HOURS: i64 = 87_600;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StepForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    #[validate(range(min = 0, max = MAX_STEP_SLA_HOURS))]
    pub sla_hours: Option<i64>,
    #[serde(default)]
    pub approver_role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddDefinitionForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1), nested)]
    pub steps: Vec<StepForm>,
}

pub struct AddDefinitionPayload {
    pub name: ProcessName,
    pub steps: Vec<StepDescriptor>,
}

impl TryFrom<AddDefinitionForm> for AddDefinitionPayload {
    type Error = FormError;

    fn try_from(form: AddDefinitionForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let steps = form
            .steps
            .into_iter()
            .map(|step| {
                Ok(StepDescriptor {
                    name: StepName::new(step.name).map_err(|_| FormError::InvalidName)?,
                    requires_approval: step.requires_approval,
                    sla_hours: step.sla_hours,
                    approver_role: optional_text(step.approver_role)
                        .map(|role| RoleName::new(role).map_err(|_| FormError::InvalidName))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>, FormError>>()?;

        Ok(Self {
            name: ProcessName::new(form.name).map_err(|_| FormError::InvalidName)?,
            steps,
        })
    }
}

impl AddDefinitionPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewProcessDefinition {
        NewProcessDefinition {
            team_id,
            name: self.name,
            steps: self.steps,
        }
    }
}

/// Body of the complete/fail endpoints. `step_index` names the step the
/// caller believes is current, so stale requests are refused.
#[derive(Debug, Deserialize)]
pub struct StepActionForm {
    pub step_index: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct StepActionPayload {
    pub step_index: i32,
    pub notes: Option<Notes>,
}

impl TryFrom<StepActionForm> for StepActionPayload {
    type Error = FormError;

    fn try_from(form: StepActionForm) -> Result<Self, Self::Error> {
        if form.step_index < 0 {
            return Err(FormError::InvalidId);
        }
        Ok(Self {
            step_index: form.step_index,
            notes: notes(form.notes)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApprovalForm {
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

pub struct ApprovalPayload {
    pub decision: ApprovalDecision,
    pub comment: Option<Notes>,
}

impl TryFrom<ApprovalForm> for ApprovalPayload {
    type Error = FormError;

    fn try_from(form: ApprovalForm) -> Result<Self, Self::Error> {
        Ok(Self {
            decision: form.decision,
            comment: notes(form.comment)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelForm {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelForm {
    pub fn into_reason(self) -> Result<Option<Notes>, FormError> {
        notes(self.reason)
    }
}

fn notes(value: Option<String>) -> Result<Option<Notes>, FormError> {
    optional_text(value)
        .map(|text| Notes::new(text).map_err(|_| FormError::InvalidNotes))
        .transpose()
}
