//! Company accounts, duplicate detection and merging of companies and leads.

use chrono::Utc;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::company::{
    Company, CompanyMerge, MergeOutcome, MergedCompanyFields, check_merge,
};
use crate::domain::duplicates::{DuplicateCandidate, DuplicateSettings, Matchable, rank_candidates};
use crate::domain::lead::{Lead, LeadMerge, MergedLeadFields, check_lead_merge};
use crate::domain::types::{CompanyId, LeadId, MemberId, TeamId};
use crate::dto::companies::LeadDuplicates;
use crate::forms::companies::{
    AddCompanyForm, AddCompanyPayload, MergeCompaniesForm, MergeCompaniesPayload,
};
use crate::forms::leads::{MergeLeadsForm, MergeLeadsPayload};
use crate::repository::{CompanyReader, CompanyWriter, LeadReader, LeadWriter, MemberReader};
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Fails unless `member_id` is a member of the team.
pub(crate) fn ensure_team_member<R>(
    repo: &R,
    member_id: MemberId,
    team_id: TeamId,
) -> ServiceResult<()>
where
    R: MemberReader + ?Sized,
{
    match repo.get_member_by_id(member_id, team_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::Form(format!(
            "member {member_id} does not belong to this team"
        ))),
    }
}

pub fn create_company<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: AddCompanyForm,
) -> ServiceResult<Company>
where
    R: CompanyWriter + MemberReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = AddCompanyPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    if let Some(owner_id) = payload.owner_id {
        ensure_team_member(repo, owner_id, team_id)?;
    }

    let company = repo
        .create_company(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create company: {err}");
            err
        })?;

    Ok(company)
}

pub fn list_companies<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Company>>
where
    R: CompanyReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_companies(team_id)?)
}

pub fn get_company<R>(repo: &R, user: &AuthenticatedUser, company_id: i32) -> ServiceResult<Company>
where
    R: CompanyReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let company_id = CompanyId::new(company_id)?;

    repo.get_company_by_id(company_id, team_id)?
        .filter(|company| !company.is_deleted())
        .ok_or(ServiceError::NotFound)
}

/// Other companies of the team that likely describe the same account.
pub fn find_company_duplicates<R>(
    repo: &R,
    settings: &DuplicateSettings,
    user: &AuthenticatedUser,
    company_id: i32,
) -> ServiceResult<Vec<DuplicateCandidate<Company>>>
where
    R: CompanyReader + ?Sized,
{
    let company = get_company(repo, user, company_id)?;

    let others: Vec<Company> = repo
        .list_companies(company.team_id)?
        .into_iter()
        .filter(|other| other.id != company.id)
        .collect();

    Ok(rank_candidates(&company.match_profile(), others, settings))
}

/// Likely duplicates of a lead among the team's other leads and companies.
pub fn find_lead_duplicates<R>(
    repo: &R,
    settings: &DuplicateSettings,
    user: &AuthenticatedUser,
    lead_id: i32,
) -> ServiceResult<LeadDuplicates>
where
    R: LeadReader + CompanyReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let lead_id = LeadId::new(lead_id)?;

    let lead = repo
        .get_lead_by_id(lead_id, team_id)?
        .filter(|lead| lead.deleted_at.is_none())
        .ok_or(ServiceError::NotFound)?;
    let profile = lead.match_profile();

    let leads = repo
        .list_all_leads(team_id)?
        .into_iter()
        .filter(|other| other.id != lead.id)
        .collect();
    let companies = repo.list_companies(team_id)?;

    Ok(LeadDuplicates {
        leads: rank_candidates(&profile, leads, settings),
        companies: rank_candidates(&profile, companies, settings),
    })
}

/// Folds the duplicate company into the primary.
///
/// Missing, deleted or identical records are not errors: they come back as
/// [`MergeOutcome::Rejected`] so callers can show the reason.
pub fn merge_companies<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: MergeCompaniesForm,
) -> ServiceResult<MergeOutcome>
where
    R: CompanyReader + CompanyWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = MergeCompaniesPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    let primary = repo.get_company_by_id(payload.primary_id, team_id)?;
    let duplicate = if payload.primary_id == payload.duplicate_id {
        None
    } else {
        repo.get_company_by_id(payload.duplicate_id, team_id)?
    };

    if let Err(reason) = check_merge(
        payload.primary_id,
        payload.duplicate_id,
        primary.as_ref(),
        duplicate.as_ref(),
    ) {
        log::info!(
            "Merge of company {} into {} rejected: {}",
            payload.duplicate_id,
            payload.primary_id,
            reason.message()
        );
        return Ok(MergeOutcome::rejected(reason));
    }

    let (Some(primary), Some(duplicate)) = (primary, duplicate) else {
        return Err(ServiceError::Internal(
            "merge guard passed without both records".to_string(),
        ));
    };

    let merge = CompanyMerge {
        team_id,
        primary_id: primary.id,
        duplicate_id: duplicate.id,
        fields: MergedCompanyFields::resolve(&primary, &duplicate, &payload.selection),
        merged_at: Utc::now().naive_utc(),
    };

    let summary = repo.merge_companies(&merge).map_err(|err| {
        log::error!(
            "Failed to merge company {} into {}: {err}",
            duplicate.id,
            primary.id
        );
        err
    })?;

    log::info!(
        "Company {} merged into {}: {} opportunities, {} cases, {} leads reattached",
        duplicate.id,
        primary.id,
        summary.reattached_opportunities,
        summary.reattached_cases,
        summary.reattached_leads
    );

    Ok(MergeOutcome::Merged(summary))
}

/// Folds the duplicate lead into the primary, which keeps its id.
///
/// Rejections follow [`merge_companies`]; converted leads are refused as
/// well since their data already lives on in a company.
pub fn merge_leads<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: MergeLeadsForm,
) -> ServiceResult<MergeOutcome<Lead>>
where
    R: LeadReader + LeadWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = MergeLeadsPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    let primary = repo.get_lead_by_id(payload.primary_id, team_id)?;
    let duplicate = if payload.primary_id == payload.duplicate_id {
        None
    } else {
        repo.get_lead_by_id(payload.duplicate_id, team_id)?
    };

    if let Err(reason) = check_lead_merge(
        payload.primary_id,
        payload.duplicate_id,
        primary.as_ref(),
        duplicate.as_ref(),
    ) {
        log::info!(
            "Merge of lead {} into {} rejected: {}",
            payload.duplicate_id,
            payload.primary_id,
            reason.message()
        );
        return Ok(MergeOutcome::rejected(reason));
    }

    let (Some(primary), Some(duplicate)) = (primary, duplicate) else {
        return Err(ServiceError::Internal(
            "merge guard passed without both records".to_string(),
        ));
    };

    let merge = LeadMerge {
        team_id,
        primary_id: primary.id,
        duplicate_id: duplicate.id,
        fields: MergedLeadFields::resolve(&primary, &duplicate, &payload.selection),
        merged_at: Utc::now().naive_utc(),
    };

    let lead = repo.merge_leads(&merge).map_err(|err| {
        log::error!("Failed to merge lead {} into {}: {err}", duplicate.id, primary.id);
        err
    })?;

    log::info!("Lead {} merged into {}", duplicate.id, primary.id);

    Ok(MergeOutcome::Merged(lead))
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;

    use super::*;
    use crate::domain::company::tests::sample_company;
    use crate::domain::company::{MergeRejection, MergeSummary};
    use crate::domain::lead::tests::sample_lead;
    use crate::domain::types::CompanyDomain;
    use crate::repository::mock::MockRepository;
    use crate::services::tests::{admin_user, viewer_user};

    fn merge_form(primary_id: i32, duplicate_id: i32) -> MergeCompaniesForm {
        MergeCompaniesForm {
            primary_id,
            duplicate_id,
            fields: HashMap::from([("name".to_string(), "duplicate".to_string())]),
        }
    }

    #[test]
    fn duplicates_exclude_the_record_itself() {
        let mut repo = MockRepository::new();
        repo.expect_get_company_by_id()
            .returning(|id, _| Ok(Some(sample_company(id.get(), "Acme Inc."))));
        repo.expect_list_companies().returning(|_| {
            let mut same_domain = sample_company(2, "ACME");
            same_domain.domain = Some(CompanyDomain::new("acme.com").unwrap());
            Ok(vec![
                sample_company(1, "Acme Inc."),
                same_domain,
                sample_company(3, "Globex"),
            ])
        });

        let candidates =
            find_company_duplicates(&repo, &DuplicateSettings::default(), &viewer_user(), 1)
                .unwrap();

        let ids: Vec<i32> = candidates.iter().map(|c| c.record.id.get()).collect();
        assert_eq!(ids, vec![2]);
        assert!((candidates[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lead_duplicates_search_leads_and_companies() {
        let mut repo = MockRepository::new();
        repo.expect_get_lead_by_id().returning(|id, _| {
            let mut lead = sample_lead(id.get());
            lead.company_name = Some("Initech LLC".to_string());
            Ok(Some(lead))
        });
        repo.expect_list_all_leads().returning(|_| {
            let mut twin = sample_lead(2);
            twin.company_name = Some("Initech".to_string());
            let mut myself = sample_lead(1);
            myself.company_name = Some("Initech LLC".to_string());
            Ok(vec![myself, twin, sample_lead(3)])
        });
        repo.expect_list_companies()
            .returning(|_| Ok(vec![sample_company(7, "Initech"), sample_company(8, "Hooli")]));

        let found =
            find_lead_duplicates(&repo, &DuplicateSettings::default(), &viewer_user(), 1).unwrap();

        assert_eq!(found.leads.len(), 1);
        assert_eq!(found.leads[0].record.id.get(), 2);
        assert_eq!(found.companies.len(), 1);
        assert_eq!(found.companies[0].record.id.get(), 7);
    }

    #[test]
    fn merge_requires_admin() {
        let repo = MockRepository::new();

        let result = merge_companies(&repo, &viewer_user(), merge_form(1, 2));

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn merging_a_record_into_itself_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_company_by_id()
            .returning(|id, _| Ok(Some(sample_company(id.get(), "Acme"))));
        repo.expect_merge_companies().never();

        let outcome = merge_companies(&repo, &admin_user(), merge_form(1, 1)).unwrap();

        assert_eq!(outcome, MergeOutcome::rejected(MergeRejection::SameRecord));
    }

    #[test]
    fn merging_a_deleted_duplicate_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_company_by_id().returning(|id, _| {
            let mut company = sample_company(id.get(), "Acme");
            if id.get() == 2 {
                company.deleted_at = Some(Utc::now().naive_utc());
            }
            Ok(Some(company))
        });
        repo.expect_merge_companies().never();

        let outcome = merge_companies(&repo, &admin_user(), merge_form(1, 2)).unwrap();

        assert!(!outcome.is_success());
        assert_eq!(
            outcome,
            MergeOutcome::rejected(MergeRejection::DuplicateDeleted)
        );
    }

    #[test]
    fn merge_applies_the_field_selection() {
        let mut repo = MockRepository::new();
        repo.expect_get_company_by_id().returning(|id, _| {
            let name = if id.get() == 1 { "Acme" } else { "Acme Corporation" };
            Ok(Some(sample_company(id.get(), name)))
        });
        repo.expect_merge_companies()
            .withf(|merge| {
                merge.primary_id.get() == 1
                    && merge.duplicate_id.get() == 2
                    && merge.fields.name.as_str() == "Acme Corporation"
            })
            .times(1)
            .returning(|merge| {
                let mut company = sample_company(1, merge.fields.name.as_str());
                company.updated_at = merge.merged_at;
                Ok(MergeSummary {
                    company,
                    reattached_opportunities: 2,
                    reattached_cases: 1,
                    reattached_leads: 0,
                })
            });

        let outcome = merge_companies(&repo, &admin_user(), merge_form(1, 2)).unwrap();

        match outcome {
            MergeOutcome::Merged(summary) => {
                assert_eq!(summary.company.name.as_str(), "Acme Corporation");
                assert_eq!(summary.reattached_opportunities, 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn company_owner_must_belong_to_the_team() {
        let mut repo = MockRepository::new();
        repo.expect_get_member_by_id().returning(|_, _| Ok(None));
        repo.expect_create_company().never();

        let result = create_company(
            &repo,
            &viewer_user(),
            AddCompanyForm {
                name: "Acme".to_string(),
                owner_id: Some(4),
                ..AddCompanyForm::default()
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    fn lead_merge_form(primary_id: i32, duplicate_id: i32) -> MergeLeadsForm {
        MergeLeadsForm {
            primary_id,
            duplicate_id,
            fields: HashMap::from([("email".to_string(), "duplicate".to_string())]),
        }
    }

    #[test]
    fn merging_a_converted_lead_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_lead_by_id().returning(|id, _| {
            let mut lead = sample_lead(id.get());
            if id.get() == 2 {
                lead.status = crate::domain::lead::LeadStatus::Converted;
            }
            Ok(Some(lead))
        });
        repo.expect_merge_leads().never();

        let outcome = merge_leads(&repo, &admin_user(), lead_merge_form(1, 2)).unwrap();

        assert_eq!(
            outcome,
            MergeOutcome::rejected(MergeRejection::DuplicateConverted)
        );
    }

    #[test]
    fn lead_merge_takes_selected_fields_from_the_duplicate() {
        let mut repo = MockRepository::new();
        repo.expect_get_lead_by_id().returning(|id, _| {
            let mut lead = sample_lead(id.get());
            let email = format!("lead{}@acme.com", id.get());
            lead.email = Some(crate::domain::types::EmailAddress::new(email).unwrap());
            Ok(Some(lead))
        });
        repo.expect_merge_leads()
            .withf(|merge| {
                merge.primary_id.get() == 1
                    && merge.duplicate_id.get() == 2
                    && merge.fields.name.as_str() == "Lead 1"
                    && merge.fields.email.as_ref().map(|e| e.as_str()) == Some("lead2@acme.com")
            })
            .times(1)
            .returning(|merge| {
                let mut lead = sample_lead(1);
                lead.email = merge.fields.email.clone();
                Ok(lead)
            });

        let outcome = merge_leads(&repo, &admin_user(), lead_merge_form(1, 2)).unwrap();

        match outcome {
            MergeOutcome::Merged(lead) => {
                assert_eq!(lead.id.get(), 1);
                assert_eq!(lead.email.as_ref().map(|e| e.as_str()), Some("lead2@acme.com"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn lead_merge_requires_admin() {
        let repo = MockRepository::new();

        let result = merge_leads(&repo, &viewer_user(), lead_merge_form(1, 2));

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }
}
