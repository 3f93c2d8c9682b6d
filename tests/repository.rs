use std::collections::HashMap;

use chrono::{Duration, Utc};
use teamcrm::domain::company::{MergeOutcome, MergeRejection};
use teamcrm::domain::lead::LeadStatus;
use teamcrm::domain::member::Member;
use teamcrm::domain::opportunity::OpportunityStage;
use teamcrm::domain::process::{ApprovalDecision, AuditAction, ExecutionStatus, StepStatus};
use teamcrm::domain::sla::SlaPolicy;
use teamcrm::domain::types::TeamId;
use teamcrm::forms::companies::{AddCompanyForm, MergeCompaniesForm};
use teamcrm::forms::leads::{AddLeadForm, AssignLeadForm, ConvertLeadForm, LeadListForm};
use teamcrm::forms::members::AddMemberForm;
use teamcrm::forms::opportunities::AddOpportunityForm;
use teamcrm::forms::processes::{
    AddDefinitionForm, ApprovalForm, CancelForm, StepActionForm, StepForm,
};
use teamcrm::forms::support_cases::OpenCaseForm;
use teamcrm::forms::territories::{AddTerritoryForm, TerritoryRuleForm};
use teamcrm::repository::{DieselRepository, ProcessReader};
use teamcrm::services::hooks::HookRegistry;
use teamcrm::services::{
    ServiceError, companies, leads, members, opportunities, processes, support_cases, territories,
};

mod common;

fn add_member(repo: &DieselRepository, name: &str) -> Member {
    members::add_member(
        repo,
        &common::admin(1),
        AddMemberForm {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        },
    )
    .unwrap()
}

fn lead_form(name: &str) -> AddLeadForm {
    AddLeadForm {
        name: name.to_string(),
        ..Default::default()
    }
}

fn assign(repo: &DieselRepository, lead_id: i32, strategy: &str) -> Option<i32> {
    leads::assign_lead(
        repo,
        &HookRegistry::default(),
        &common::admin(1),
        lead_id,
        AssignLeadForm {
            strategy: strategy.to_string(),
        },
    )
    .unwrap()
    .decision
    .member_id
    .map(|id| id.get())
}

#[test]
fn test_round_robin_wraps_and_persists_cursor() {
    let test_db = common::TestDb::new("test_round_robin.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let ids: Vec<i32> = ["Ann", "Bob", "Cid"]
        .iter()
        .map(|name| add_member(&repo, name).id.get())
        .collect();

    let mut picked = Vec::new();
    for n in 0..4 {
        let lead =
            leads::create_lead(&repo, &hooks, &admin, lead_form(&format!("Lead {n}"))).unwrap();
        picked.push(assign(&repo, lead.id.get(), "round_robin").unwrap());
    }

    assert_eq!(picked, vec![ids[0], ids[1], ids[2], ids[0]]);
}

#[test]
fn test_weighted_assignment_prefers_least_loaded() {
    let test_db = common::TestDb::new("test_weighted.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let ann = add_member(&repo, "Ann").id.get();
    let bob = add_member(&repo, "Bob").id.get();

    let mut picked = Vec::new();
    for n in 0..3 {
        let lead =
            leads::create_lead(&repo, &hooks, &admin, lead_form(&format!("Lead {n}"))).unwrap();
        picked.push(assign(&repo, lead.id.get(), "weighted").unwrap());
    }

    assert_eq!(picked, vec![ann, bob, ann]);
}

#[test]
fn test_territory_assignment_matches_rules() {
    let test_db = common::TestDb::new("test_territory.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    add_member(&repo, "Ann");
    let bob = add_member(&repo, "Bob").id.get();

    territories::create_territory(
        &repo,
        &admin,
        AddTerritoryForm {
            name: "DACH".to_string(),
            owner_id: bob,
            priority: 1,
            rules: vec![TerritoryRuleForm {
                field: "country".to_string(),
                value: "DE".to_string(),
            }],
        },
    )
    .unwrap();

    let german = leads::create_lead(
        &repo,
        &hooks,
        &admin,
        AddLeadForm {
            country: Some("de".to_string()),
            ..lead_form("Berlin GmbH")
        },
    )
    .unwrap();
    let french = leads::create_lead(
        &repo,
        &hooks,
        &admin,
        AddLeadForm {
            country: Some("FR".to_string()),
            ..lead_form("Paris SARL")
        },
    )
    .unwrap();

    assert_eq!(assign(&repo, german.id.get(), "territory"), Some(bob));
    assert_eq!(assign(&repo, french.id.get(), "territory"), None);
}

#[test]
fn test_conversion_creates_company_and_opportunity_once() {
    let test_db = common::TestDb::new("test_conversion.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let lead = leads::create_lead(
        &repo,
        &hooks,
        &admin,
        AddLeadForm {
            company_name: Some("Acme".to_string()),
            ..lead_form("Jane Roe")
        },
    )
    .unwrap();

    let converted = leads::convert_lead(
        &repo,
        &hooks,
        &admin,
        lead.id.get(),
        ConvertLeadForm {
            opportunity_name: Some("Acme pilot".to_string()),
            amount_cents: Some(50_000),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(converted.lead.status, LeadStatus::Converted);
    assert_eq!(converted.lead.converted_company_id, Some(converted.company_id));

    let company = companies::get_company(&repo, &admin, converted.company_id.get()).unwrap();
    assert_eq!(company.name.as_str(), "Acme");

    let opportunities =
        opportunities::list_opportunities(&repo, &admin, Some(converted.company_id.get())).unwrap();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].stage, OpportunityStage::Prospecting);
    assert_eq!(Some(opportunities[0].id), converted.opportunity_id);

    let again = leads::convert_lead(
        &repo,
        &hooks,
        &admin,
        lead.id.get(),
        ConvertLeadForm::default(),
    );
    assert!(matches!(again, Err(ServiceError::InvalidState(_))));
}

#[test]
fn test_merge_reattaches_children_and_retires_duplicate() {
    let test_db = common::TestDb::new("test_merge.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let company = |name: &str, domain: &str| {
        companies::create_company(
            &repo,
            &admin,
            AddCompanyForm {
                name: name.to_string(),
                domain: Some(domain.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    };
    let primary = company("Acme Corp", "acme.com");
    let duplicate = company("ACME Corporation", "acme.com");

    opportunities::create_opportunity(
        &repo,
        &admin,
        AddOpportunityForm {
            name: "Renewal".to_string(),
            company_id: Some(duplicate.id.get()),
            amount_cents: 10_000,
            owner_id: None,
        },
    )
    .unwrap();
    support_cases::open_case(
        &repo,
        &hooks,
        &SlaPolicy::default(),
        &admin,
        OpenCaseForm {
            subject: "Login broken".to_string(),
            description: None,
            priority: "high".to_string(),
            company_id: Some(duplicate.id.get()),
            assigned_to: None,
        },
    )
    .unwrap();

    let merge = |primary_id: i32, duplicate_id: i32| {
        companies::merge_companies(
            &repo,
            &admin,
            MergeCompaniesForm {
                primary_id,
                duplicate_id,
                fields: HashMap::new(),
            },
        )
        .unwrap()
    };

    let MergeOutcome::Merged(summary) = merge(primary.id.get(), duplicate.id.get()) else {
        panic!("merge should succeed");
    };
    assert_eq!(summary.reattached_opportunities, 1);
    assert_eq!(summary.reattached_cases, 1);

    let moved = opportunities::list_opportunities(&repo, &admin, Some(primary.id.get())).unwrap();
    assert_eq!(moved.len(), 1);
    assert!(matches!(
        companies::get_company(&repo, &admin, duplicate.id.get()),
        Err(ServiceError::NotFound)
    ));

    match merge(primary.id.get(), duplicate.id.get()) {
        MergeOutcome::Rejected { reason, .. } => {
            assert_eq!(reason, MergeRejection::DuplicateDeleted)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_process_with_approval_audits_every_transition() {
    let test_db = common::TestDb::new("test_process.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let definition = processes::create_definition(
        &repo,
        &admin,
        AddDefinitionForm {
            name: "Discount approval".to_string(),
            steps: vec![
                StepForm {
                    name: "Prepare quote".to_string(),
                    requires_approval: false,
                    sla_hours: Some(24),
                    approver_role: None,
                },
                StepForm {
                    name: "Manager sign-off".to_string(),
                    requires_approval: true,
                    sla_hours: None,
                    approver_role: Some("sales_manager".to_string()),
                },
            ],
        },
    )
    .unwrap();

    let execution = processes::start_process(&repo, &admin, definition.id.get()).unwrap();
    let id = execution.id.get();
    assert_eq!(execution.status, ExecutionStatus::Pending);

    processes::execute_next_step(&repo, &admin, id).unwrap();

    let out_of_order = processes::complete_step(
        &repo,
        &hooks,
        &admin,
        id,
        StepActionForm {
            step_index: 1,
            notes: None,
        },
    );
    assert!(matches!(out_of_order, Err(ServiceError::InvalidState(_))));

    processes::complete_step(
        &repo,
        &hooks,
        &admin,
        id,
        StepActionForm {
            step_index: 0,
            notes: Some("sent".to_string()),
        },
    )
    .unwrap();

    let waiting = processes::execute_next_step(&repo, &admin, id).unwrap();
    assert_eq!(waiting.execution.status, ExecutionStatus::AwaitingApproval);

    let clerk = common::user(1, "clerk@example.com", &["crm", "crm_approver"]);
    let denied = processes::decide_approval(
        &repo,
        &clerk,
        id,
        ApprovalForm {
            decision: ApprovalDecision::Approve,
            comment: None,
        },
    );
    assert!(matches!(denied, Err(ServiceError::Unauthorized)));

    processes::decide_approval(
        &repo,
        &admin,
        id,
        ApprovalForm {
            decision: ApprovalDecision::Approve,
            comment: Some("ok".to_string()),
        },
    )
    .unwrap();

    let done = processes::complete_step(
        &repo,
        &hooks,
        &admin,
        id,
        StepActionForm {
            step_index: 1,
            notes: None,
        },
    )
    .unwrap();
    assert_eq!(done.execution.status, ExecutionStatus::Completed);
    assert!(done.execution.completed_at.is_some());

    let detail = processes::get_execution_detail(&repo, &admin, id).unwrap();
    let actions: Vec<AuditAction> = detail.audit_log.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Started,
            AuditAction::StepStarted,
            AuditAction::StepCompleted,
            AuditAction::StepStarted,
            AuditAction::ApprovalGranted,
            AuditAction::Completed,
        ]
    );
    assert!(
        detail
            .steps
            .iter()
            .all(|step| step.status == StepStatus::Completed)
    );
}

#[test]
fn test_sla_sweep_escalates_monotonically() {
    let test_db = common::TestDb::new("test_sla_sweep.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let policy = SlaPolicy::default();

    let case = support_cases::open_case(
        &repo,
        &hooks,
        &policy,
        &common::admin(1),
        OpenCaseForm {
            subject: "Outage".to_string(),
            description: Some("API down".to_string()),
            priority: "critical".to_string(),
            company_id: None,
            assigned_to: None,
        },
    )
    .unwrap();
    assert_eq!(case.due_at, case.created_at + Duration::hours(4));

    let team = Some(TeamId::new(1).unwrap());
    let early =
        support_cases::sweep_breaches(&repo, &hooks, &policy, team, case.created_at).unwrap();
    assert_eq!(early.breached, 0);

    let later = case.due_at + Duration::hours(1);
    let first = support_cases::sweep_breaches(&repo, &hooks, &policy, team, later).unwrap();
    assert_eq!(first.escalations.len(), 1);
    assert_eq!(first.escalations[0].level, 1);

    let repeat = support_cases::sweep_breaches(&repo, &hooks, &policy, team, later).unwrap();
    assert!(repeat.escalations.is_empty());

    let much_later = case.due_at + Duration::hours(30);
    let second = support_cases::sweep_breaches(&repo, &hooks, &policy, None, much_later).unwrap();
    assert_eq!(second.escalations[0].previous_level, 1);
    assert_eq!(second.escalations[0].level, 3);

    let resolved = support_cases::resolve_case(&repo, &common::admin(1), case.id.get()).unwrap();
    assert!(resolved.resolved_at.is_some());
    let far_future = Utc::now().naive_utc() + Duration::days(30);
    let after = support_cases::sweep_breaches(&repo, &hooks, &policy, None, far_future).unwrap();
    assert_eq!(after.breached, 0);
}

#[test]
fn test_records_are_scoped_to_their_team() {
    let test_db = common::TestDb::new("test_team_scope.db");
    let repo = DieselRepository::new(test_db.pool());

    let lead = leads::create_lead(
        &repo,
        &HookRegistry::default(),
        &common::admin(1),
        lead_form("Private"),
    )
    .unwrap();

    assert!(matches!(
        leads::get_lead(&repo, &common::admin(2), lead.id.get()),
        Err(ServiceError::NotFound)
    ));
}

fn step_form(name: &str, requires_approval: bool, sla_hours: Option<i64>) -> StepForm {
    StepForm {
        name: name.to_string(),
        requires_approval,
        sla_hours,
        approver_role: None,
    }
}

#[test]
fn test_closed_executions_leave_the_overdue_report() {
    let test_db = common::TestDb::new("test_overdue_closed.db");
    let repo = DieselRepository::new(test_db.pool());
    let hooks = HookRegistry::default();
    let admin = common::admin(1);

    let definition = processes::create_definition(
        &repo,
        &admin,
        AddDefinitionForm {
            name: "Onboarding".to_string(),
            steps: vec![
                step_form("Kickoff", false, Some(1)),
                step_form("Sign-off", true, Some(1)),
            ],
        },
    )
    .unwrap();
    let later = Utc::now().naive_utc() + Duration::hours(5);

    let cancelled = processes::start_process(&repo, &admin, definition.id.get())
        .unwrap()
        .id
        .get();
    processes::execute_next_step(&repo, &admin, cancelled).unwrap();
    assert_eq!(processes::overdue_steps(&repo, None, later).unwrap().len(), 1);

    let applied = processes::cancel_execution(
        &repo,
        &admin,
        cancelled,
        CancelForm {
            reason: Some("deal lost".to_string()),
        },
    )
    .unwrap();
    assert_eq!(applied.execution.status, ExecutionStatus::Cancelled);
    assert!(processes::overdue_steps(&repo, None, later).unwrap().is_empty());

    let detail = processes::get_execution_detail(&repo, &admin, cancelled).unwrap();
    assert_eq!(detail.steps[0].status, StepStatus::Cancelled);

    let failed = processes::start_process(&repo, &admin, definition.id.get())
        .unwrap()
        .id
        .get();
    processes::execute_next_step(&repo, &admin, failed).unwrap();
    processes::complete_step(
        &repo,
        &hooks,
        &admin,
        failed,
        StepActionForm {
            step_index: 0,
            notes: None,
        },
    )
    .unwrap();
    let waiting = processes::execute_next_step(&repo, &admin, failed).unwrap();
    let waiting_step = waiting.step.unwrap();
    assert!(repo.get_pending_approval(waiting_step.id).unwrap().is_some());
    assert_eq!(processes::overdue_steps(&repo, None, later).unwrap().len(), 1);

    let applied = processes::fail_step(
        &repo,
        &admin,
        failed,
        StepActionForm {
            step_index: 1,
            notes: Some("customer went silent".to_string()),
        },
    )
    .unwrap();
    assert_eq!(applied.execution.status, ExecutionStatus::Failed);
    assert!(repo.get_pending_approval(waiting_step.id).unwrap().is_none());
    assert!(processes::overdue_steps(&repo, None, later).unwrap().is_empty());
}

#[test]
fn test_step_sla_beyond_bound_is_rejected() {
    let test_db = common::TestDb::new("test_step_sla_bound.db");
    let repo = DieselRepository::new(test_db.pool());

    let result = processes::create_definition(
        &repo,
        &common::admin(1),
        AddDefinitionForm {
            name: "Forever".to_string(),
            steps: vec![step_form("Wait", false, Some(3_000_000_000))],
        },
    );

    assert!(matches!(result, Err(ServiceError::Form(_))));
    assert!(
        processes::list_definitions(&repo, &common::admin(1))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_lead_pages_far_past_the_end_are_empty() {
    let test_db = common::TestDb::new("test_lead_pages.db");
    let repo = DieselRepository::new(test_db.pool());
    let admin = common::admin(1);

    leads::create_lead(&repo, &HookRegistry::default(), &admin, lead_form("Only")).unwrap();

    let page = leads::list_leads(
        &repo,
        &admin,
        LeadListForm {
            page: Some(usize::MAX),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
}
