use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        support_case::{CasePriority, NewSupportCase},
        types::{CaseSubject, CompanyId, MemberId, Notes, TeamId},
    },
    forms::{FormError, optional_text, parse_label},
};

#[derive(Debug, Deserialize, Validate)]
pub struct OpenCaseForm {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: String,
    #[serde(default)]
    pub company_id: Option<i32>,
    #[serde(default)]
    pub assigned_to: Option<i32>,
}

pub struct OpenCasePayload {
    pub subject: CaseSubject,
    pub description: Option<Notes>,
    pub priority: CasePriority,
    pub company_id: Option<CompanyId>,
    pub assigned_to: Option<MemberId>,
}

impl TryFrom<OpenCaseForm> for OpenCasePayload {
    type Error = FormError;

    fn try_from(form: OpenCaseForm) -> Result<Self, Self::Error> {
        form.validate()?;

        Ok(Self {
            subject: CaseSubject::new(form.subject).map_err(|_| FormError::InvalidName)?,
            description: optional_text(form.description)
                .map(|text| Notes::new(text).map_err(|_| FormError::InvalidNotes))
                .transpose()?,
            priority: parse_label("priority", &form.priority)?,
            company_id: form
                .company_id
                .map(|id| CompanyId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
            assigned_to: form
                .assigned_to
                .map(|id| MemberId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
        })
    }
}

impl OpenCasePayload {
    pub fn into_domain(self, team_id: TeamId, due_at: NaiveDateTime) -> NewSupportCase {
        NewSupportCase {
            team_id,
            company_id: self.company_id,
            subject: self.subject,
            description: self.description,
            priority: self.priority,
            assigned_to: self.assigned_to,
            due_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePriorityForm {
    pub priority: String,
}

impl TryFrom<ChangePriorityForm> for CasePriority {
    type Error = FormError;

    fn try_from(form: ChangePriorityForm) -> Result<Self, Self::Error> {
        parse_label("priority", &form.priority)
    }
}
