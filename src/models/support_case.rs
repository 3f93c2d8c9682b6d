use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::support_case::{
    CasePriority, CaseStatus, NewSupportCase as DomainNewSupportCase,
    SupportCase as DomainSupportCase,
};
use crate::domain::types::{CaseSubject, Notes, SupportCaseId, TeamId, TypeConstraintError};
use crate::models::optional_id;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::support_cases)]
/// Diesel model for [`crate::domain::support_case::SupportCase`].
pub struct SupportCase {
    pub id: i32,
    pub team_id: i32,
    pub company_id: Option<i32>,
    pub subject: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub assigned_to: Option<i32>,
    pub due_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub escalation_level: i32,
    pub escalated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::support_cases)]
/// Insertable form of [`SupportCase`].
pub struct NewSupportCase<'a> {
    pub team_id: i32,
    pub company_id: Option<i32>,
    pub subject: &'a str,
    pub description: Option<&'a str>,
    pub priority: &'a str,
    pub status: &'a str,
    pub assigned_to: Option<i32>,
    pub due_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SupportCase> for DomainSupportCase {
    type Error = TypeConstraintError;

    fn try_from(case: SupportCase) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SupportCaseId::try_from(case.id)?,
            team_id: TeamId::try_from(case.team_id)?,
            company_id: optional_id(case.company_id)?,
            subject: CaseSubject::new(case.subject)?,
            description: Notes::optional(case.description),
            priority: CasePriority::try_from(case.priority)?,
            status: CaseStatus::try_from(case.status)?,
            assigned_to: optional_id(case.assigned_to)?,
            due_at: case.due_at,
            resolved_at: case.resolved_at,
            escalation_level: case.escalation_level,
            escalated_at: case.escalated_at,
            created_at: case.created_at,
            updated_at: case.updated_at,
            deleted_at: case.deleted_at,
        })
    }
}

impl<'a> NewSupportCase<'a> {
    /// Opened cases start `open`; `opened_at` is the SLA clock start.
    pub fn new(case: &'a DomainNewSupportCase, opened_at: NaiveDateTime) -> Self {
        Self {
            team_id: case.team_id.get(),
            company_id: case.company_id.map(|id| id.get()),
            subject: case.subject.as_str(),
            description: case.description.as_ref().map(Notes::as_str),
            priority: case.priority.as_str(),
            status: CaseStatus::Open.as_str(),
            assigned_to: case.assigned_to.map(|id| id.get()),
            due_at: case.due_at,
            created_at: opened_at,
            updated_at: opened_at,
        }
    }
}
