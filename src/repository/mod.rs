//! Persistence traits per aggregate and their Diesel implementation.
//!
//! Every method is scoped by [`TeamId`] where the aggregate carries one, so a
//! caller can never read or write another team's rows by guessing ids.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::{
    db::{DbConnection, DbPool, get_connection},
    domain::{
        company::{Company, CompanyMerge, MergeSummary, NewCompany},
        extension::{Extension, HookEvent, NewExtension},
        lead::{ConvertedLead, Lead, LeadConversion, LeadMerge, LeadStatus, NewLead},
        member::{Member, NewMember},
        opportunity::{NewOpportunity, Opportunity, StageChange},
        process::{
            AppliedTransition, AuditLogEntry, NewAuditEntry, NewProcessDefinition,
            NewProcessExecution, ProcessApproval, ProcessDefinition, ProcessExecution,
            ProcessStep, ProcessTransition,
        },
        support_case::{CasePriority, NewSupportCase, SupportCase},
        territory::{NewTerritory, Territory},
        types::{
            CompanyId, ExtensionId, LeadId, MemberId, OpportunityId,
            ProcessDefinitionId, ProcessExecutionId, ProcessStepId, SupportCaseId, TeamId,
            TerritoryId,
        },
    },
    repository::errors::RepositoryResult,
};

pub mod company;
pub mod errors;
pub mod extension;
pub mod lead;
pub mod member;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod opportunity;
pub mod process;
pub mod support_case;
pub mod territory;

/// Diesel backed implementation of every repository trait.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(get_connection(&self.pool)?)
    }
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    /// Rows to skip; saturates instead of overflowing on absurd page numbers.
    pub fn offset(&self) -> i64 {
        let skipped = self.page.max(1).saturating_sub(1).saturating_mul(self.per_page);
        i64::try_from(skipped).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.per_page).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct LeadListQuery {
    pub team_id: TeamId,
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<MemberId>,
    pub pagination: Option<Pagination>,
}

impl LeadListQuery {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            status: None,
            assigned_to: None,
            pagination: None,
        }
    }

    pub fn status(mut self, status: LeadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn assigned_to(mut self, member_id: MemberId) -> Self {
        self.assigned_to = Some(member_id);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

pub trait MemberReader {
    fn get_member_by_id(&self, id: MemberId, team_id: TeamId) -> RepositoryResult<Option<Member>>;
    fn list_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>>;
    /// Members eligible for new work, ordered by id.
    fn list_active_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>>;
}

pub trait MemberWriter {
    fn create_or_update_member(&self, new_member: &NewMember) -> RepositoryResult<Member>;
    fn set_member_active(
        &self,
        id: MemberId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Member>;
}

pub trait LeadReader {
    /// Returns soft-deleted leads too; callers decide how to treat them.
    fn get_lead_by_id(&self, id: LeadId, team_id: TeamId) -> RepositoryResult<Option<Lead>>;
    fn list_leads(&self, query: LeadListQuery) -> RepositoryResult<(usize, Vec<Lead>)>;
    /// Every non-deleted lead of the team.
    fn list_all_leads(&self, team_id: TeamId) -> RepositoryResult<Vec<Lead>>;
    /// Open leads per assigned member.
    fn count_open_leads(&self, team_id: TeamId) -> RepositoryResult<HashMap<MemberId, i64>>;
    fn get_assignment_cursor(&self, team_id: TeamId) -> RepositoryResult<Option<MemberId>>;
}

pub trait LeadWriter {
    fn create_lead(&self, new_lead: &NewLead) -> RepositoryResult<Lead>;
    fn create_leads(&self, new_leads: &[NewLead]) -> RepositoryResult<usize>;
    /// Sets the owner; with `save_cursor` the team's round-robin cursor moves
    /// to `member_id` in the same transaction.
    fn assign_lead(
        &self,
        id: LeadId,
        team_id: TeamId,
        member_id: MemberId,
        save_cursor: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<Lead>;
    fn update_lead_status(
        &self,
        id: LeadId,
        team_id: TeamId,
        status: LeadStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<Lead>;
    fn convert_lead(&self, conversion: &LeadConversion) -> RepositoryResult<ConvertedLead>;
    fn delete_lead(&self, id: LeadId, team_id: TeamId, now: NaiveDateTime) -> RepositoryResult<()>;
    /// Retires the duplicate and writes the merged fields onto the primary;
    /// returns the surviving lead.
    fn merge_leads(&self, merge: &LeadMerge) -> RepositoryResult<Lead>;
}

pub trait CompanyReader {
    /// Returns soft-deleted companies too.
    fn get_company_by_id(&self, id: CompanyId, team_id: TeamId)
    -> RepositoryResult<Option<Company>>;
    /// Every non-deleted company of the team.
    fn list_companies(&self, team_id: TeamId) -> RepositoryResult<Vec<Company>>;
}

pub trait CompanyWriter {
    fn create_company(&self, new_company: &NewCompany) -> RepositoryResult<Company>;
    fn merge_companies(&self, merge: &CompanyMerge) -> RepositoryResult<MergeSummary>;
}

pub trait OpportunityReader {
    fn get_opportunity_by_id(
        &self,
        id: OpportunityId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<Opportunity>>;
    fn list_opportunities(
        &self,
        team_id: TeamId,
        company_id: Option<CompanyId>,
    ) -> RepositoryResult<Vec<Opportunity>>;
}

pub trait OpportunityWriter {
    fn create_opportunity(&self, new_opportunity: &NewOpportunity)
    -> RepositoryResult<Opportunity>;
    fn update_opportunity_stage(
        &self,
        id: OpportunityId,
        team_id: TeamId,
        change: &StageChange,
        now: NaiveDateTime,
    ) -> RepositoryResult<Opportunity>;
}

pub trait SupportCaseReader {
    fn get_case_by_id(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<SupportCase>>;
    fn list_cases(&self, team_id: TeamId) -> RepositoryResult<Vec<SupportCase>>;
    /// Unfinished, non-deleted cases with `due_at < now`; all teams when
    /// `team_id` is `None`.
    fn list_breached_cases(
        &self,
        team_id: Option<TeamId>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<SupportCase>>;
}

pub trait SupportCaseWriter {
    fn create_case(
        &self,
        new_case: &NewSupportCase,
        opened_at: NaiveDateTime,
    ) -> RepositoryResult<SupportCase>;
    fn escalate_case(
        &self,
        id: SupportCaseId,
        level: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase>;
    fn resolve_case(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase>;
    fn update_case_priority(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
        priority: CasePriority,
        due_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase>;
}

pub trait TerritoryReader {
    fn get_territory_by_id(
        &self,
        id: TerritoryId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<Territory>>;
    /// All territories ordered by `(priority, id)`.
    fn list_territories(&self, team_id: TeamId) -> RepositoryResult<Vec<Territory>>;
}

pub trait TerritoryWriter {
    fn create_territory(&self, new_territory: &NewTerritory) -> RepositoryResult<Territory>;
    fn set_territory_active(
        &self,
        id: TerritoryId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Territory>;
}

pub trait ProcessReader {
    fn get_definition(
        &self,
        id: ProcessDefinitionId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<ProcessDefinition>>;
    fn list_definitions(&self, team_id: TeamId) -> RepositoryResult<Vec<ProcessDefinition>>;
    fn get_execution(
        &self,
        id: ProcessExecutionId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<ProcessExecution>>;
    fn list_steps(&self, execution_id: ProcessExecutionId) -> RepositoryResult<Vec<ProcessStep>>;
    fn get_step_at(
        &self,
        execution_id: ProcessExecutionId,
        step_index: i32,
    ) -> RepositoryResult<Option<ProcessStep>>;
    fn get_pending_approval(&self, step_id: ProcessStepId)
    -> RepositoryResult<Option<ProcessApproval>>;
    fn list_audit_log(&self, execution_id: ProcessExecutionId)
    -> RepositoryResult<Vec<AuditLogEntry>>;
    /// Open steps with `due_at < now`, with the owning execution.
    fn list_overdue_steps(
        &self,
        team_id: Option<TeamId>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<(ProcessExecution, ProcessStep)>>;
}

pub trait ProcessWriter {
    fn create_definition(
        &self,
        new_definition: &NewProcessDefinition,
    ) -> RepositoryResult<ProcessDefinition>;
    fn start_execution(
        &self,
        new_execution: &NewProcessExecution,
        audit: &NewAuditEntry,
    ) -> RepositoryResult<ProcessExecution>;
    /// Writes every row change of the transition and its audit entry atomically.
    fn apply_transition(&self, transition: &ProcessTransition)
    -> RepositoryResult<AppliedTransition>;
}

pub trait ExtensionReader {
    fn list_extensions(&self, team_id: TeamId) -> RepositoryResult<Vec<Extension>>;
    /// Active extensions bound to `event`, ordered by `(priority, id)`.
    fn list_active_extensions(
        &self,
        team_id: TeamId,
        event: HookEvent,
    ) -> RepositoryResult<Vec<Extension>>;
}

pub trait ExtensionWriter {
    fn create_extension(&self, new_extension: &NewExtension) -> RepositoryResult<Extension>;
    fn set_extension_active(
        &self,
        id: ExtensionId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Extension>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_offsets_saturate() {
        let second = Pagination {
            page: 2,
            per_page: 20,
        };
        assert_eq!(second.offset(), 20);
        assert_eq!(second.limit(), 20);

        let first = Pagination {
            page: 0,
            per_page: 20,
        };
        assert_eq!(first.offset(), 0);

        let absurd = Pagination {
            page: usize::MAX,
            per_page: 20,
        };
        assert_eq!(absurd.offset(), i64::MAX);
    }
}
