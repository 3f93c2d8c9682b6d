use chrono::Utc;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::extension::HookEvent;
use crate::domain::opportunity::{Opportunity, OpportunityStage};
use crate::domain::types::{CompanyId, OpportunityId, TeamId};
use crate::forms::opportunities::{AddOpportunityForm, AddOpportunityPayload, ChangeStageForm};
use crate::repository::{
    CompanyReader, ExtensionReader, MemberReader, OpportunityReader, OpportunityWriter,
};
use crate::services::companies::ensure_team_member;
use crate::services::hooks::{HookRegistry, fire};
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::SERVICE_ACCESS_ROLE;

/// Opens an opportunity at `prospecting`. A referenced company must be a
/// live account of the caller's team.
pub fn create_opportunity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: AddOpportunityForm,
) -> ServiceResult<Opportunity>
where
    R: OpportunityWriter + CompanyReader + MemberReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = AddOpportunityPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    if let Some(company_id) = payload.company_id {
        repo.get_company_by_id(company_id, team_id)?
            .filter(|company| !company.is_deleted())
            .ok_or_else(|| ServiceError::Form(format!("company {company_id} does not exist")))?;
    }
    if let Some(owner_id) = payload.owner_id {
        ensure_team_member(repo, owner_id, team_id)?;
    }

    let opportunity = repo
        .create_opportunity(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create opportunity: {err}");
            err
        })?;

    Ok(opportunity)
}

pub fn list_opportunities<R>(
    repo: &R,
    user: &AuthenticatedUser,
    company_id: Option<i32>,
) -> ServiceResult<Vec<Opportunity>>
where
    R: OpportunityReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let company_id = company_id.map(CompanyId::new).transpose()?;

    Ok(repo.list_opportunities(team_id, company_id)?)
}

/// Moves the opportunity to another stage and resets its probability.
pub fn change_stage<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    opportunity_id: i32,
    form: ChangeStageForm,
) -> ServiceResult<Opportunity>
where
    R: OpportunityReader + OpportunityWriter + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let next = OpportunityStage::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let opportunity_id = OpportunityId::new(opportunity_id)?;

    let opportunity = repo
        .get_opportunity_by_id(opportunity_id, team_id)?
        .ok_or(ServiceError::NotFound)?;

    let now = Utc::now().naive_utc();
    let change = opportunity.plan_stage_change(next, now)?;

    let updated = repo
        .update_opportunity_stage(opportunity_id, team_id, &change, now)
        .map_err(|err| {
            log::error!("Failed to move opportunity {opportunity_id} to {next}: {err}");
            err
        })?;

    log::info!(
        "Opportunity {opportunity_id} moved from {} to {}",
        change.from,
        change.stage
    );

    fire(
        repo,
        hooks,
        team_id,
        HookEvent::OpportunityStageChanged,
        &serde_json::json!({
            "opportunity": &updated,
            "from": change.from,
            "to": change.stage,
        }),
    );

    Ok(updated)
}
