//! Support cases and the SLA breach sweep.

use chrono::{NaiveDateTime, Utc};

use crate::domain::auth::AuthenticatedUser;
use crate::domain::extension::HookEvent;
use crate::domain::sla::SlaPolicy;
use crate::domain::support_case::{CasePriority, Escalation, SupportCase};
use crate::domain::types::{SupportCaseId, TeamId};
use crate::dto::support_cases::SweepReport;
use crate::forms::support_cases::{ChangePriorityForm, OpenCaseForm, OpenCasePayload};
use crate::repository::errors::RepositoryError;
use crate::repository::{
    CompanyReader, ExtensionReader, MemberReader, SupportCaseReader, SupportCaseWriter,
};
use crate::services::companies::ensure_team_member;
use crate::services::hooks::{HookRegistry, fire};
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Opens a case due according to the SLA target of its priority.
pub fn open_case<R>(
    repo: &R,
    hooks: &HookRegistry,
    policy: &SlaPolicy,
    user: &AuthenticatedUser,
    form: OpenCaseForm,
) -> ServiceResult<SupportCase>
where
    R: SupportCaseWriter + CompanyReader + MemberReader + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = OpenCasePayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    if let Some(company_id) = payload.company_id {
        repo.get_company_by_id(company_id, team_id)?
            .filter(|company| !company.is_deleted())
            .ok_or_else(|| ServiceError::Form(format!("company {company_id} does not exist")))?;
    }
    if let Some(member_id) = payload.assigned_to {
        ensure_team_member(repo, member_id, team_id)?;
    }

    let opened_at = Utc::now().naive_utc();
    let due_at = sla_due_at(policy, payload.priority, opened_at)?;

    let case = repo
        .create_case(&payload.into_domain(team_id, due_at), opened_at)
        .map_err(|err| {
            log::error!("Failed to open support case: {err}");
            err
        })?;

    log::info!(
        "Support case {} opened with priority {}, due {}",
        case.id,
        case.priority,
        case.due_at
    );

    fire(repo, hooks, team_id, HookEvent::CaseCreated, &case);

    Ok(case)
}

fn sla_due_at(
    policy: &SlaPolicy,
    priority: CasePriority,
    opened_at: NaiveDateTime,
) -> ServiceResult<NaiveDateTime> {
    policy.due_at(priority, opened_at).ok_or_else(|| {
        log::error!("SLA target for {priority} priority is out of range");
        ServiceError::InvalidState(format!("SLA target for {priority} priority is out of range"))
    })
}

pub fn list_cases<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<SupportCase>>
where
    R: SupportCaseReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_cases(team_id)?)
}

/// Loads a case of the caller's team that is still being worked on.
fn load_open_case<R>(repo: &R, team_id: TeamId, case_id: SupportCaseId) -> ServiceResult<SupportCase>
where
    R: SupportCaseReader + ?Sized,
{
    let case = repo
        .get_case_by_id(case_id, team_id)?
        .ok_or(ServiceError::NotFound)?;

    if case.status.is_finished() {
        return Err(ServiceError::InvalidState(format!(
            "case is already {}",
            case.status
        )));
    }

    Ok(case)
}

pub fn resolve_case<R>(
    repo: &R,
    user: &AuthenticatedUser,
    case_id: i32,
) -> ServiceResult<SupportCase>
where
    R: SupportCaseReader + SupportCaseWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let case_id = SupportCaseId::new(case_id)?;

    load_open_case(repo, team_id, case_id)?;

    let case = repo
        .resolve_case(case_id, team_id, Utc::now().naive_utc())
        .map_err(|err| {
            log::error!("Failed to resolve case {case_id}: {err}");
            err
        })?;

    log::info!("Support case {case_id} resolved");

    Ok(case)
}

/// Re-prioritizes a case; the due date is recomputed from when it was opened.
pub fn change_priority<R>(
    repo: &R,
    policy: &SlaPolicy,
    user: &AuthenticatedUser,
    case_id: i32,
    form: ChangePriorityForm,
) -> ServiceResult<SupportCase>
where
    R: SupportCaseReader + SupportCaseWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let priority = CasePriority::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let case_id = SupportCaseId::new(case_id)?;

    let case = load_open_case(repo, team_id, case_id)?;
    let due_at = sla_due_at(policy, priority, case.created_at)?;

    Ok(repo.update_case_priority(case_id, team_id, priority, due_at, Utc::now().naive_utc())?)
}

/// Raises the escalation level of every breached case whose breach crossed
/// another threshold since the last sweep.
///
/// Runs across all teams when `team_id` is `None`. A case changed by a
/// concurrent sweep is skipped.
pub fn sweep_breaches<R>(
    repo: &R,
    hooks: &HookRegistry,
    policy: &SlaPolicy,
    team_id: Option<TeamId>,
    now: NaiveDateTime,
) -> ServiceResult<SweepReport>
where
    R: SupportCaseReader + SupportCaseWriter + ExtensionReader + ?Sized,
{
    let breached = repo.list_breached_cases(team_id, now).map_err(|err| {
        log::error!("Failed to load breached cases: {err}");
        err
    })?;

    let mut report = SweepReport {
        breached: breached.len(),
        escalations: Vec::new(),
    };

    for case in &breached {
        let Some(level) = case.next_escalation(policy, now) else {
            continue;
        };

        let escalated = match repo.escalate_case(case.id, level, now) {
            Ok(escalated) => escalated,
            Err(RepositoryError::Conflict(message)) => {
                log::warn!("Skipping escalation of case {}: {message}", case.id);
                continue;
            }
            Err(err) => {
                log::error!("Failed to escalate case {}: {err}", case.id);
                return Err(err.into());
            }
        };

        log::info!(
            "Support case {} escalated from level {} to {}",
            case.id,
            case.escalation_level,
            escalated.escalation_level
        );

        let escalation = Escalation {
            case_id: escalated.id,
            team_id: escalated.team_id,
            previous_level: case.escalation_level,
            level: escalated.escalation_level,
        };
        fire(
            repo,
            hooks,
            escalated.team_id,
            HookEvent::CaseEscalated,
            &serde_json::json!({ "case": &escalated, "escalation": &escalation }),
        );
        report.escalations.push(escalation);
    }

    Ok(report)
}

/// Sweeps the caller's team on demand.
pub fn sweep_team_breaches<R>(
    repo: &R,
    hooks: &HookRegistry,
    policy: &SlaPolicy,
    user: &AuthenticatedUser,
) -> ServiceResult<SweepReport>
where
    R: SupportCaseReader + SupportCaseWriter + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    sweep_breaches(repo, hooks, policy, Some(team_id), Utc::now().naive_utc())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::domain::support_case::CaseStatus;
    use crate::domain::types::CaseSubject;
    use crate::repository::mock::MockRepository;
    use crate::services::tests::{admin_user, viewer_user};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn sample_case(id: i32, due_at: NaiveDateTime, escalation_level: i32) -> SupportCase {
        SupportCase {
            id: SupportCaseId::new(id).unwrap(),
            team_id: TeamId::new(1).unwrap(),
            company_id: None,
            subject: CaseSubject::new("Printer on fire").unwrap(),
            description: None,
            priority: CasePriority::High,
            status: CaseStatus::Open,
            assigned_to: None,
            due_at,
            resolved_at: None,
            escalation_level,
            escalated_at: None,
            created_at: due_at - Duration::hours(8),
            updated_at: due_at - Duration::hours(8),
            deleted_at: None,
        }
    }

    #[test]
    fn sweep_escalates_only_when_a_new_threshold_is_crossed() {
        let mut repo = MockRepository::new();
        repo.expect_list_breached_cases()
            .withf(|team_id, _| team_id.is_none())
            .returning(|_, _| {
                Ok(vec![
                    // 5h past due: level 2 reached, stored 0.
                    sample_case(1, at(5), 0),
                    // 5h past due, already at level 2.
                    sample_case(2, at(5), 2),
                ])
            });
        repo.expect_escalate_case()
            .withf(|id, level, _| id.get() == 1 && *level == 2)
            .times(1)
            .returning(|id, level, now| {
                let mut case = sample_case(id.get(), at(5), level);
                case.escalated_at = Some(now);
                Ok(case)
            });
        repo.expect_list_active_extensions()
            .withf(|_, event| *event == HookEvent::CaseEscalated)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let report = sweep_breaches(
            &repo,
            &HookRegistry::default(),
            &SlaPolicy::default(),
            None,
            at(10),
        )
        .unwrap();

        assert_eq!(report.breached, 2);
        assert_eq!(
            report.escalations,
            vec![Escalation {
                case_id: SupportCaseId::new(1).unwrap(),
                team_id: TeamId::new(1).unwrap(),
                previous_level: 0,
                level: 2,
            }]
        );
    }

    #[test]
    fn sweep_skips_cases_escalated_concurrently() {
        let mut repo = MockRepository::new();
        repo.expect_list_breached_cases()
            .returning(|_, _| Ok(vec![sample_case(1, at(5), 0)]));
        repo.expect_escalate_case()
            .returning(|_, _, _| Err(RepositoryError::Conflict("escalated".into())));
        repo.expect_list_active_extensions().never();

        let report = sweep_breaches(
            &repo,
            &HookRegistry::default(),
            &SlaPolicy::default(),
            None,
            at(10),
        )
        .unwrap();

        assert!(report.escalations.is_empty());
    }

    #[test]
    fn team_sweep_requires_admin_and_scopes_to_team() {
        let mut repo = MockRepository::new();
        repo.expect_list_breached_cases()
            .withf(|team_id, _| *team_id == Some(TeamId::new(1).unwrap()))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let policy = SlaPolicy::default();
        assert!(matches!(
            sweep_team_breaches(&repo, &HookRegistry::default(), &policy, &viewer_user()),
            Err(ServiceError::Unauthorized)
        ));
        let report =
            sweep_team_breaches(&repo, &HookRegistry::default(), &policy, &admin_user()).unwrap();
        assert_eq!(report.breached, 0);
    }

    #[test]
    fn priority_change_recomputes_due_from_creation() {
        let mut repo = MockRepository::new();
        repo.expect_get_case_by_id()
            .returning(|id, _| Ok(Some(sample_case(id.get(), at(12), 0))));
        repo.expect_update_case_priority()
            .withf(|_, _, priority, due_at, _| {
                *priority == CasePriority::Critical && *due_at == at(8)
            })
            .times(1)
            .returning(|id, _, priority, due_at, _| {
                let mut case = sample_case(id.get(), due_at, 0);
                case.priority = priority;
                Ok(case)
            });

        let case = change_priority(
            &repo,
            &SlaPolicy::default(),
            &viewer_user(),
            3,
            ChangePriorityForm {
                priority: "critical".to_string(),
            },
        )
        .unwrap();

        assert_eq!(case.due_at, at(8));
    }

    #[test]
    fn resolving_twice_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_case_by_id().returning(|id, _| {
            let mut case = sample_case(id.get(), at(12), 0);
            case.status = CaseStatus::Resolved;
            Ok(Some(case))
        });
        repo.expect_resolve_case().never();

        assert!(matches!(
            resolve_case(&repo, &viewer_user(), 3),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn opening_sets_due_date_and_fires_hook() {
        let mut repo = MockRepository::new();
        repo.expect_create_case()
            .withf(|new_case, opened_at| {
                new_case.priority == CasePriority::Critical
                    && new_case.due_at == *opened_at + Duration::hours(4)
            })
            .times(1)
            .returning(|new_case, opened_at| {
                let mut case = sample_case(1, new_case.due_at, 0);
                case.priority = new_case.priority;
                case.created_at = opened_at;
                Ok(case)
            });
        repo.expect_list_active_extensions()
            .withf(|_, event| *event == HookEvent::CaseCreated)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let case = open_case(
            &repo,
            &HookRegistry::default(),
            &SlaPolicy::default(),
            &viewer_user(),
            OpenCaseForm {
                subject: "Outage".to_string(),
                description: None,
                priority: "critical".to_string(),
                company_id: None,
                assigned_to: None,
            },
        )
        .unwrap();

        assert_eq!(case.due_at - case.created_at, Duration::hours(4));
    }

    #[test]
    fn out_of_range_sla_target_is_refused_before_insert() {
        let mut repo = MockRepository::new();
        repo.expect_create_case().never();

        let policy = SlaPolicy {
            critical_hours: i64::MAX,
            ..SlaPolicy::default()
        };

        let result = open_case(
            &repo,
            &HookRegistry::default(),
            &policy,
            &viewer_user(),
            OpenCaseForm {
                subject: "Outage".to_string(),
                description: None,
                priority: "critical".to_string(),
                company_id: None,
                assigned_to: None,
            },
        );

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }
}
