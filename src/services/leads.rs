//! Lead intake, assignment, status changes and conversion.

use chrono::Utc;

use crate::domain::assignment::{
    AssignmentDecision, AssignmentStrategy, pick_least_loaded, pick_round_robin,
};
use crate::domain::auth::AuthenticatedUser;
use crate::domain::extension::HookEvent;
use crate::domain::lead::{ConversionTarget, ConvertedLead, Lead, LeadConversion, LeadStatus};
use crate::domain::member::Member;
use crate::domain::territory::first_matching;
use crate::domain::types::{CompanyName, LeadId, MemberId, TeamId};
use crate::dto::leads::{ImportSummary, LeadAssignment};
use crate::forms::leads::{
    AddLeadForm, AddLeadPayload, AssignLeadForm, ConvertLeadForm, ConvertLeadPayload,
    LeadListForm, LeadListPayload, LeadStatusForm, parse_leads_csv,
};
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use crate::repository::{
    CompanyReader, ExtensionReader, LeadListQuery, LeadReader, LeadWriter, MemberReader,
    MemberWriter, TerritoryReader,
};
use crate::services::hooks::{HookRegistry, fire};
use crate::services::members::current_member;
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Loads a lead of the caller's team; deleted leads are reported as missing.
pub fn get_lead<R>(repo: &R, user: &AuthenticatedUser, lead_id: i32) -> ServiceResult<Lead>
where
    R: LeadReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    repo.get_lead_by_id(lead_id, team_id)?
        .filter(|lead| lead.deleted_at.is_none())
        .ok_or(ServiceError::NotFound)
}

pub fn create_lead<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    form: AddLeadForm,
) -> ServiceResult<Lead>
where
    R: LeadWriter + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = AddLeadPayload::try_from(form)?;

    let team_id = TeamId::new(user.hub_id)?;

    let lead = repo
        .create_lead(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create lead: {err}");
            err
        })?;

    fire(repo, hooks, team_id, HookEvent::LeadCreated, &lead);

    Ok(lead)
}

/// Stores every row of a CSV upload, or none of them if any row is invalid.
///
/// Bulk imports do not fire `lead_created`.
pub fn import_leads<R>(repo: &R, user: &AuthenticatedUser, data: &[u8]) -> ServiceResult<ImportSummary>
where
    R: LeadWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    let new_leads: Vec<_> = parse_leads_csv(data)?
        .into_iter()
        .map(|payload| payload.into_domain(team_id))
        .collect();

    if new_leads.is_empty() {
        return Ok(ImportSummary { imported: 0 });
    }

    let imported = repo.create_leads(&new_leads).map_err(|err| {
        log::error!("Failed to import leads: {err}");
        err
    })?;

    log::info!("Imported {imported} leads into team {team_id}");

    Ok(ImportSummary { imported })
}

pub fn list_leads<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: LeadListForm,
) -> ServiceResult<Paginated<Lead>>
where
    R: LeadReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = LeadListPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    let mut query = LeadListQuery::new(team_id).paginate(payload.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = payload.status {
        query = query.status(status);
    }
    if let Some(member_id) = payload.assigned_to {
        query = query.assigned_to(member_id);
    }

    let (total, leads) = repo.list_leads(query).map_err(|err| {
        log::error!("Failed to list leads: {err}");
        err
    })?;

    Ok(Paginated::new(
        leads,
        payload.page,
        total,
        DEFAULT_ITEMS_PER_PAGE,
    ))
}

/// Picks the member the strategy selects among `members`, if any.
fn choose_member<R>(
    repo: &R,
    strategy: AssignmentStrategy,
    lead: &Lead,
    members: &[Member],
) -> ServiceResult<Option<MemberId>>
where
    R: LeadReader + TerritoryReader + ?Sized,
{
    if members.is_empty() {
        return Ok(None);
    }

    let chosen = match strategy {
        AssignmentStrategy::RoundRobin => {
            let cursor = repo.get_assignment_cursor(lead.team_id)?;
            pick_round_robin(members, cursor).map(|member| member.id)
        }
        AssignmentStrategy::Territory => {
            let territories = repo.list_territories(lead.team_id)?;
            first_matching(&territories, lead)
                .map(|territory| territory.owner_id)
                .filter(|owner| members.iter().any(|m| m.id == *owner && m.is_active))
        }
        AssignmentStrategy::Weighted => {
            let loads = repo.count_open_leads(lead.team_id)?;
            pick_least_loaded(members, &loads).map(|member| member.id)
        }
    };

    Ok(chosen)
}

/// Assigns the lead with the requested strategy.
///
/// When no eligible member can be chosen the lead is left untouched and the
/// decision carries no member.
pub fn assign_lead<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    lead_id: i32,
    form: AssignLeadForm,
) -> ServiceResult<LeadAssignment>
where
    R: LeadReader + LeadWriter + MemberReader + TerritoryReader + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let strategy = AssignmentStrategy::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    let lead = repo
        .get_lead_by_id(lead_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    lead.ensure_workable()?;

    let members = repo.list_active_members(team_id)?;

    let Some(member_id) = choose_member(repo, strategy, &lead, &members)? else {
        log::info!("No eligible member for lead {lead_id} using {strategy}");
        return Ok(LeadAssignment {
            decision: AssignmentDecision {
                strategy,
                member_id: None,
            },
            lead,
        });
    };

    let now = Utc::now().naive_utc();
    let save_cursor = strategy == AssignmentStrategy::RoundRobin;

    let lead = repo
        .assign_lead(lead_id, team_id, member_id, save_cursor, now)
        .map_err(|err| {
            log::error!("Failed to assign lead {lead_id}: {err}");
            err
        })?;

    log::info!("Lead {lead_id} assigned to member {member_id} using {strategy}");

    fire(repo, hooks, team_id, HookEvent::LeadAssigned, &lead);

    Ok(LeadAssignment {
        decision: AssignmentDecision {
            strategy,
            member_id: Some(member_id),
        },
        lead,
    })
}

/// Moves the lead between the working statuses; conversion has its own
/// operation.
pub fn update_lead_status<R>(
    repo: &R,
    user: &AuthenticatedUser,
    lead_id: i32,
    form: LeadStatusForm,
) -> ServiceResult<Lead>
where
    R: LeadReader + LeadWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let status = LeadStatus::try_from(form)?;
    if status == LeadStatus::Converted {
        return Err(ServiceError::InvalidState(
            "leads are converted through the conversion endpoint".to_string(),
        ));
    }

    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    let lead = repo
        .get_lead_by_id(lead_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    lead.ensure_workable()?;

    let now = Utc::now().naive_utc();

    Ok(repo.update_lead_status(lead_id, team_id, status, now)?)
}

/// Converts the lead into a company and, optionally, an opportunity.
///
/// The new records are owned by the lead's assignee, or by the caller when
/// the lead is unassigned.
pub fn convert_lead<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    lead_id: i32,
    form: ConvertLeadForm,
) -> ServiceResult<ConvertedLead>
where
    R: LeadReader + LeadWriter + CompanyReader + MemberWriter + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = ConvertLeadPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    let lead = repo
        .get_lead_by_id(lead_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    lead.ensure_workable()?;

    let target = match payload.company_id {
        Some(company_id) => {
            let company = repo
                .get_company_by_id(company_id, team_id)?
                .filter(|company| !company.is_deleted())
                .ok_or(ServiceError::NotFound)?;
            ConversionTarget::ExistingCompany(company.id)
        }
        None => {
            let name = match payload.company_name {
                Some(name) => name,
                None => CompanyName::new(
                    lead.company_name.as_deref().unwrap_or(lead.name.as_str()),
                )?,
            };
            ConversionTarget::NewCompany(name)
        }
    };

    let owner_id = match lead.assigned_to {
        Some(member_id) => member_id,
        None => current_member(repo, user)?.id,
    };

    let conversion = LeadConversion {
        lead_id,
        team_id,
        target,
        opportunity: payload.opportunity,
        owner_id: Some(owner_id),
        converted_at: Utc::now().naive_utc(),
    };

    let converted = repo.convert_lead(&conversion).map_err(|err| {
        log::error!("Failed to convert lead {lead_id}: {err}");
        err
    })?;

    log::info!(
        "Lead {lead_id} converted into company {}",
        converted.company_id
    );

    fire(repo, hooks, team_id, HookEvent::LeadConverted, &converted);

    Ok(converted)
}

pub fn delete_lead<R>(repo: &R, user: &AuthenticatedUser, lead_id: i32) -> ServiceResult<()>
where
    R: LeadWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    repo.delete_lead(lead_id, team_id, Utc::now().naive_utc())
        .map_err(|err| {
            log::error!("Failed to delete lead {lead_id}: {err}");
            err
        })?;

    log::info!("Lead {lead_id} deleted from team {team_id}");

    Ok(())
}
