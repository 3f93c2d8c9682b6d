//! Mock repository implementations for isolating services in tests.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use mockall::mock;

use crate::domain::company::{Company, CompanyMerge, MergeSummary, NewCompany};
use crate::domain::extension::{Extension, HookEvent, NewExtension};
use crate::domain::lead::{ConvertedLead, Lead, LeadConversion, LeadMerge, LeadStatus, NewLead};
use crate::domain::member::{Member, NewMember};
use crate::domain::opportunity::{NewOpportunity, Opportunity, StageChange};
use crate::domain::process::{
    AppliedTransition, AuditLogEntry, NewAuditEntry, NewProcessDefinition, NewProcessExecution,
    ProcessApproval, ProcessDefinition, ProcessExecution, ProcessStep, ProcessTransition,
};
use crate::domain::support_case::{CasePriority, NewSupportCase, SupportCase};
use crate::domain::territory::{NewTerritory, Territory};
use crate::domain::types::{
    CompanyId, ExtensionId, LeadId, MemberId, OpportunityId, ProcessDefinitionId,
    ProcessExecutionId, ProcessStepId, SupportCaseId, TeamId, TerritoryId,
};
use crate::repository::errors::RepositoryResult;
use crate::repository::{
    CompanyReader, CompanyWriter, ExtensionReader, ExtensionWriter, LeadListQuery, LeadReader,
    LeadWriter, MemberReader, MemberWriter, OpportunityReader, OpportunityWriter, ProcessReader,
    ProcessWriter, SupportCaseReader, SupportCaseWriter, TerritoryReader, TerritoryWriter,
};

mock! {
    pub Repository {}

    impl MemberReader for Repository {
        fn get_member_by_id(&self, id: MemberId, team_id: TeamId) -> RepositoryResult<Option<Member>>;
        fn list_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>>;
        fn list_active_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>>;
    }

    impl MemberWriter for Repository {
        fn create_or_update_member(&self, new_member: &NewMember) -> RepositoryResult<Member>;
        fn set_member_active(
            &self,
            id: MemberId,
            team_id: TeamId,
            is_active: bool,
        ) -> RepositoryResult<Member>;
    }

    impl LeadReader for Repository {
        fn get_lead_by_id(&self, id: LeadId, team_id: TeamId) -> RepositoryResult<Option<Lead>>;
        fn list_leads(&self, query: LeadListQuery) -> RepositoryResult<(usize, Vec<Lead>)>;
        fn list_all_leads(&self, team_id: TeamId) -> RepositoryResult<Vec<Lead>>;
        fn count_open_leads(&self, team_id: TeamId) -> RepositoryResult<HashMap<MemberId, i64>>;
        fn get_assignment_cursor(&self, team_id: TeamId) -> RepositoryResult<Option<MemberId>>;
    }

    impl LeadWriter for Repository {
        fn create_lead(&self, new_lead: &NewLead) -> RepositoryResult<Lead>;
        fn create_leads(&self, new_leads: &[NewLead]) -> RepositoryResult<usize>;
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
        fn merge_leads(&self, merge: &LeadMerge) -> RepositoryResult<Lead>;
    }

    impl CompanyReader for Repository {
        fn get_company_by_id(&self, id: CompanyId, team_id: TeamId) -> RepositoryResult<Option<Company>>;
        fn list_companies(&self, team_id: TeamId) -> RepositoryResult<Vec<Company>>;
    }

    impl CompanyWriter for Repository {
        fn create_company(&self, new_company: &NewCompany) -> RepositoryResult<Company>;
        fn merge_companies(&self, merge: &CompanyMerge) -> RepositoryResult<MergeSummary>;
    }

    impl OpportunityReader for Repository {
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

    impl OpportunityWriter for Repository {
        fn create_opportunity(&self, new_opportunity: &NewOpportunity) -> RepositoryResult<Opportunity>;
        fn update_opportunity_stage(
            &self,
            id: OpportunityId,
            team_id: TeamId,
            change: &StageChange,
            now: NaiveDateTime,
        ) -> RepositoryResult<Opportunity>;
    }

    impl SupportCaseReader for Repository {
        fn get_case_by_id(
            &self,
            id: SupportCaseId,
            team_id: TeamId,
        ) -> RepositoryResult<Option<SupportCase>>;
        fn list_cases(&self, team_id: TeamId) -> RepositoryResult<Vec<SupportCase>>;
        fn list_breached_cases(
            &self,
            team_id: Option<TeamId>,
            now: NaiveDateTime,
        ) -> RepositoryResult<Vec<SupportCase>>;
    }

    impl SupportCaseWriter for Repository {
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

    impl TerritoryReader for Repository {
        fn get_territory_by_id(
            &self,
            id: TerritoryId,
            team_id: TeamId,
        ) -> RepositoryResult<Option<Territory>>;
        fn list_territories(&self, team_id: TeamId) -> RepositoryResult<Vec<Territory>>;
    }

    impl TerritoryWriter for Repository {
        fn create_territory(&self, new_territory: &NewTerritory) -> RepositoryResult<Territory>;
        fn set_territory_active(
            &self,
            id: TerritoryId,
            team_id: TeamId,
            is_active: bool,
        ) -> RepositoryResult<Territory>;
    }

    impl ProcessReader for Repository {
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
        fn get_pending_approval(&self, step_id: ProcessStepId) -> RepositoryResult<Option<ProcessApproval>>;
        fn list_audit_log(&self, execution_id: ProcessExecutionId) -> RepositoryResult<Vec<AuditLogEntry>>;
        fn list_overdue_steps(
            &self,
            team_id: Option<TeamId>,
            now: NaiveDateTime,
        ) -> RepositoryResult<Vec<(ProcessExecution, ProcessStep)>>;
    }

    impl ProcessWriter for Repository {
        fn create_definition(
            &self,
            new_definition: &NewProcessDefinition,
        ) -> RepositoryResult<ProcessDefinition>;
        fn start_execution(
            &self,
            new_execution: &NewProcessExecution,
            audit: &NewAuditEntry,
        ) -> RepositoryResult<ProcessExecution>;
        fn apply_transition(&self, transition: &ProcessTransition) -> RepositoryResult<AppliedTransition>;
    }

    impl ExtensionReader for Repository {
        fn list_extensions(&self, team_id: TeamId) -> RepositoryResult<Vec<Extension>>;
        fn list_active_extensions(
            &self,
            team_id: TeamId,
            event: HookEvent,
        ) -> RepositoryResult<Vec<Extension>>;
    }

    impl ExtensionWriter for Repository {
        fn create_extension(&self, new_extension: &NewExtension) -> RepositoryResult<Extension>;
        fn set_extension_active(
            &self,
            id: ExtensionId,
            team_id: TeamId,
            is_active: bool,
        ) -> RepositoryResult<Extension>;
    }
}
