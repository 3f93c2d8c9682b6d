//! Running process definitions: step sequencing, approvals and the audit
//! trail.
//!
//! Every operation plans its transition with the pure engine in
//! [`crate::domain::process`] and hands the whole row set to the repository,
//! which writes it together with one audit entry in a single transaction.

use chrono::{NaiveDateTime, Utc};

use crate::domain::auth::AuthenticatedUser;
use crate::domain::extension::HookEvent;
use crate::domain::process::{
    AppliedTransition, ExecutionStatus, NewProcessExecution, ProcessApproval, ProcessDefinition,
    ProcessError, ProcessExecution, ProcessStep, ProcessTransition, StepStatus,
};
use crate::domain::types::{ProcessDefinitionId, ProcessExecutionId, TeamId};
use crate::dto::processes::{ExecutionDetail, OverdueStep};
use crate::forms::processes::{
    AddDefinitionForm, AddDefinitionPayload, ApprovalForm, ApprovalPayload, CancelForm,
    StepActionForm, StepActionPayload,
};
use crate::repository::{ExtensionReader, MemberWriter, ProcessReader, ProcessWriter};
use crate::services::hooks::{HookRegistry, fire};
use crate::services::members::current_member;
use crate::services::{ServiceError, ServiceResult, check_role, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE, SERVICE_APPROVER_ROLE};

pub fn create_definition<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: AddDefinitionForm,
) -> ServiceResult<ProcessDefinition>
where
    R: ProcessWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = AddDefinitionPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    let definition = repo
        .create_definition(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create process definition: {err}");
            err
        })?;

    log::info!(
        "Process definition {} created with {} steps",
        definition.id,
        definition.steps.len()
    );

    Ok(definition)
}

pub fn list_definitions<R>(
    repo: &R,
    user: &AuthenticatedUser,
) -> ServiceResult<Vec<ProcessDefinition>>
where
    R: ProcessReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_definitions(team_id)?)
}

/// Starts a new execution of the definition, waiting at step 0.
pub fn start_process<R>(
    repo: &R,
    user: &AuthenticatedUser,
    definition_id: i32,
) -> ServiceResult<ProcessExecution>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let definition_id = ProcessDefinitionId::new(definition_id)?;

    let definition = repo
        .get_definition(definition_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    let actor = current_member(repo, user)?.id;

    let (new_execution, audit) =
        NewProcessExecution::start(&definition, actor, Utc::now().naive_utc())?;

    let execution = repo
        .start_execution(&new_execution, &audit)
        .map_err(|err| {
            log::error!("Failed to start process {definition_id}: {err}");
            err
        })?;

    log::info!(
        "Process execution {} of definition {definition_id} started",
        execution.id
    );

    Ok(execution)
}

/// The execution together with the definition it runs.
fn load_execution<R>(
    repo: &R,
    team_id: TeamId,
    execution_id: ProcessExecutionId,
) -> ServiceResult<(ProcessExecution, ProcessDefinition)>
where
    R: ProcessReader + ?Sized,
{
    let execution = repo
        .get_execution(execution_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    let definition = repo
        .get_definition(execution.definition_id, team_id)?
        .ok_or_else(|| {
            ServiceError::Internal(format!(
                "definition {} of execution {execution_id} is missing",
                execution.definition_id
            ))
        })?;
    Ok((execution, definition))
}

/// The step record at `step_index`, which must be the execution's cursor.
fn load_current_step<R>(
    repo: &R,
    execution: &ProcessExecution,
    step_index: i32,
) -> ServiceResult<ProcessStep>
where
    R: ProcessReader + ?Sized,
{
    if step_index != execution.current_step {
        return Err(ProcessError::StepNotCurrent {
            step_index,
            current_step: execution.current_step,
        }
        .into());
    }
    repo.get_step_at(execution.id, step_index)?
        .ok_or_else(|| ServiceError::InvalidState(format!("step {step_index} has not been started")))
}

fn apply<R>(repo: &R, transition: &ProcessTransition) -> ServiceResult<AppliedTransition>
where
    R: ProcessWriter + ?Sized,
{
    let applied = repo.apply_transition(transition).map_err(|err| {
        log::error!(
            "Failed to apply {} to execution {}: {err}",
            transition.audit.action,
            transition.execution_id
        );
        err
    })?;

    log::info!(
        "Process execution {} recorded {}, now {}",
        applied.execution.id,
        transition.audit.action,
        applied.execution.status
    );

    Ok(applied)
}

/// Opens the step at the cursor; approval steps wait for a decision.
pub fn execute_next_step<R>(
    repo: &R,
    user: &AuthenticatedUser,
    execution_id: i32,
) -> ServiceResult<AppliedTransition>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let (execution, definition) = load_execution(repo, team_id, execution_id)?;
    let actor = current_member(repo, user)?.id;

    let transition = execution.plan_next_step(&definition, actor, Utc::now().naive_utc())?;

    apply(repo, &transition)
}

/// Completes the current step; finishing the last one completes the
/// execution and fires `process_completed`.
pub fn complete_step<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    execution_id: i32,
    form: StepActionForm,
) -> ServiceResult<AppliedTransition>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = StepActionPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let (execution, definition) = load_execution(repo, team_id, execution_id)?;
    let step = load_current_step(repo, &execution, payload.step_index)?;
    let actor = current_member(repo, user)?.id;

    let transition = execution.plan_step_completion(
        &definition,
        &step,
        actor,
        Utc::now().naive_utc(),
        payload.notes,
    )?;

    let applied = apply(repo, &transition)?;

    if applied.execution.status == ExecutionStatus::Completed {
        fire(
            repo,
            hooks,
            team_id,
            HookEvent::ProcessCompleted,
            &serde_json::json!({
                "execution": &applied.execution,
                "definition": definition.name.as_str(),
            }),
        );
    }

    Ok(applied)
}

/// The pending approval of a step that is waiting for one.
fn pending_approval_of<R>(repo: &R, step: &ProcessStep) -> ServiceResult<Option<ProcessApproval>>
where
    R: ProcessReader + ?Sized,
{
    if step.status != StepStatus::AwaitingApproval {
        return Ok(None);
    }
    Ok(repo.get_pending_approval(step.id)?)
}

/// Fails the current step and with it the execution.
pub fn fail_step<R>(
    repo: &R,
    user: &AuthenticatedUser,
    execution_id: i32,
    form: StepActionForm,
) -> ServiceResult<AppliedTransition>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let payload = StepActionPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let (execution, _) = load_execution(repo, team_id, execution_id)?;
    let step = load_current_step(repo, &execution, payload.step_index)?;
    let actor = current_member(repo, user)?.id;

    let approval = pending_approval_of(repo, &step)?;

    let transition = execution.plan_step_failure(
        &step,
        approval.as_ref(),
        actor,
        Utc::now().naive_utc(),
        payload.notes,
    )?;

    apply(repo, &transition)
}

/// Approves or rejects the step awaiting approval.
///
/// The caller needs the approver role and, when the step names one, the
/// step's own approver role. Admins pass both checks.
pub fn decide_approval<R>(
    repo: &R,
    user: &AuthenticatedUser,
    execution_id: i32,
    form: ApprovalForm,
) -> ServiceResult<AppliedTransition>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_APPROVER_ROLE)?;

    let payload = ApprovalPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let (execution, definition) = load_execution(repo, team_id, execution_id)?;
    let step = load_current_step(repo, &execution, execution.current_step)?;

    let required_role = definition
        .step(step.step_index)
        .and_then(|descriptor| descriptor.approver_role.as_ref());
    if let Some(role) = required_role.filter(|role| !check_role(role.as_str(), &user.roles)) {
        log::warn!(
            "{} lacks role {role} to decide step {} of execution {execution_id}",
            user.email,
            step.step_index
        );
        return Err(ServiceError::Unauthorized);
    }

    let approval = repo
        .get_pending_approval(step.id)?
        .ok_or_else(|| ServiceError::InvalidState("step has no pending approval".to_string()))?;
    let actor = current_member(repo, user)?.id;

    let transition = execution.plan_approval_decision(
        &step,
        &approval,
        payload.decision,
        actor,
        Utc::now().naive_utc(),
        payload.comment,
    )?;

    apply(repo, &transition)
}

/// Cancels a running execution together with its open step.
pub fn cancel_execution<R>(
    repo: &R,
    user: &AuthenticatedUser,
    execution_id: i32,
    form: CancelForm,
) -> ServiceResult<AppliedTransition>
where
    R: ProcessReader + ProcessWriter + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let reason = form.into_reason()?;
    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let execution = repo
        .get_execution(execution_id, team_id)?
        .ok_or(ServiceError::NotFound)?;
    let actor = current_member(repo, user)?.id;

    let open_step = if execution.status.is_terminal() {
        None
    } else {
        repo.get_step_at(execution.id, execution.current_step)?
            .filter(|step| step.status.is_open())
    };
    let approval = match &open_step {
        Some(step) => pending_approval_of(repo, step)?,
        None => None,
    };

    let transition = execution.plan_cancel(
        open_step.as_ref(),
        approval.as_ref(),
        actor,
        Utc::now().naive_utc(),
        reason,
    )?;

    apply(repo, &transition)
}

pub fn get_execution_detail<R>(
    repo: &R,
    user: &AuthenticatedUser,
    execution_id: i32,
) -> ServiceResult<ExecutionDetail>
where
    R: ProcessReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let execution_id = ProcessExecutionId::new(execution_id)?;

    let execution = repo
        .get_execution(execution_id, team_id)?
        .ok_or(ServiceError::NotFound)?;

    Ok(ExecutionDetail {
        steps: repo.list_steps(execution.id)?,
        audit_log: repo.list_audit_log(execution.id)?,
        execution,
    })
}

/// Open steps past their due date; every team when `team_id` is `None`.
pub fn overdue_steps<R>(
    repo: &R,
    team_id: Option<TeamId>,
    now: NaiveDateTime,
) -> ServiceResult<Vec<OverdueStep>>
where
    R: ProcessReader + ?Sized,
{
    let rows = repo.list_overdue_steps(team_id, now).map_err(|err| {
        log::error!("Failed to load overdue process steps: {err}");
        err
    })?;

    Ok(rows
        .into_iter()
        .filter(|(_, step)| step.is_overdue(now))
        .map(|(execution, step)| OverdueStep { execution, step })
        .collect())
}

pub fn list_overdue_steps<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<OverdueStep>>
where
    R: ProcessReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    overdue_steps(repo, Some(team_id), Utc::now().naive_utc())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::domain::process::{
        ApprovalChange, ApprovalDecision, ApprovalStatus, AuditAction, StepChange,
        StepDescriptor,
    };
    use crate::domain::types::{
        MemberId, ProcessApprovalId, ProcessName, ProcessStepId, RoleName, StepName,
    };
    use crate::repository::mock::MockRepository;
    use crate::services::members::tests::sample_member;
    use crate::services::tests::{user_with_roles, viewer_user};

    fn descriptor(name: &str, requires_approval: bool, approver_role: Option<&str>) -> StepDescriptor {
        StepDescriptor {
            name: StepName::new(name).unwrap(),
            requires_approval,
            sla_hours: Some(24),
            approver_role: approver_role.map(|role| RoleName::new(role).unwrap()),
        }
    }

    fn definition(steps: Vec<StepDescriptor>) -> ProcessDefinition {
        let now = Utc::now().naive_utc();
        ProcessDefinition {
            id: ProcessDefinitionId::new(1).unwrap(),
            team_id: TeamId::new(1).unwrap(),
            name: ProcessName::new("Onboarding").unwrap(),
            steps,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn execution(status: ExecutionStatus, current_step: i32) -> ProcessExecution {
        ProcessExecution {
            id: ProcessExecutionId::new(9).unwrap(),
            team_id: TeamId::new(1).unwrap(),
            definition_id: ProcessDefinitionId::new(1).unwrap(),
            status,
            current_step,
            started_by: MemberId::new(5).unwrap(),
            started_at: Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    fn step(index: i32, status: StepStatus) -> ProcessStep {
        ProcessStep {
            id: ProcessStepId::new(30 + index).unwrap(),
            execution_id: ProcessExecutionId::new(9).unwrap(),
            step_index: index,
            name: StepName::new(format!("step {index}")).unwrap(),
            status,
            requires_approval: status == StepStatus::AwaitingApproval,
            due_at: None,
            started_at: Utc::now().naive_utc(),
            completed_at: None,
            notes: None,
        }
    }

    fn pending_approval(step_id: ProcessStepId) -> ProcessApproval {
        ProcessApproval {
            id: ProcessApprovalId::new(70).unwrap(),
            execution_id: ProcessExecutionId::new(9).unwrap(),
            step_id,
            status: ApprovalStatus::Pending,
            requested_at: Utc::now().naive_utc(),
            decided_by: None,
            decided_at: None,
            comment: None,
        }
    }

    /// Echoes the transition back as applied rows.
    fn applied(transition: &ProcessTransition) -> AppliedTransition {
        let mut execution = execution(
            transition.execution.status,
            transition.execution.current_step,
        );
        execution.completed_at = transition.execution.completed_at;
        AppliedTransition {
            execution,
            step: None,
            approval: None,
        }
    }

    fn mock_with(
        execution_state: ProcessExecution,
        steps: Vec<StepDescriptor>,
    ) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_execution()
            .returning(move |_, _| Ok(Some(execution_state.clone())));
        repo.expect_get_definition()
            .returning(move |_, _| Ok(Some(definition(steps.clone()))));
        repo.expect_create_or_update_member()
            .returning(|_| Ok(sample_member(5)));
        repo
    }

    #[test]
    fn start_audits_the_new_execution() {
        let mut repo = MockRepository::new();
        repo.expect_get_definition()
            .returning(|_, _| Ok(Some(definition(vec![descriptor("Kickoff", false, None)]))));
        repo.expect_create_or_update_member()
            .returning(|_| Ok(sample_member(5)));
        repo.expect_start_execution()
            .withf(|new_execution, audit| {
                new_execution.started_by.get() == 5 && audit.action == AuditAction::Started
            })
            .times(1)
            .returning(|_, _| Ok(execution(ExecutionStatus::Pending, 0)));

        let started = start_process(&repo, &viewer_user(), 1).unwrap();

        assert_eq!(started.status, ExecutionStatus::Pending);
        assert_eq!(started.current_step, 0);
    }

    #[test]
    fn inactive_definitions_cannot_start() {
        let mut repo = MockRepository::new();
        repo.expect_get_definition().returning(|_, _| {
            let mut inactive = definition(vec![descriptor("Kickoff", false, None)]);
            inactive.is_active = false;
            Ok(Some(inactive))
        });
        repo.expect_create_or_update_member()
            .returning(|_| Ok(sample_member(5)));
        repo.expect_start_execution().never();

        assert!(matches!(
            start_process(&repo, &viewer_user(), 1),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn next_step_requests_approval_when_required() {
        let mut repo = mock_with(
            execution(ExecutionStatus::Pending, 0),
            vec![descriptor("Sign-off", true, None)],
        );
        repo.expect_apply_transition()
            .withf(|t| {
                matches!(&t.step, StepChange::Insert(step) if step.status == StepStatus::AwaitingApproval)
                    && matches!(t.approval, ApprovalChange::Request { .. })
                    && t.execution.status == ExecutionStatus::AwaitingApproval
                    && t.audit.action == AuditAction::StepStarted
            })
            .times(1)
            .returning(|t| Ok(applied(t)));

        let result = execute_next_step(&repo, &viewer_user(), 9).unwrap();

        assert_eq!(result.execution.status, ExecutionStatus::AwaitingApproval);
    }

    #[test]
    fn completing_the_last_step_fires_process_completed() {
        let mut repo = mock_with(
            execution(ExecutionStatus::Active, 1),
            vec![descriptor("Kickoff", false, None), descriptor("Wrap-up", false, None)],
        );
        repo.expect_get_step_at()
            .returning(|_, index| Ok(Some(step(index, StepStatus::InProgress))));
        repo.expect_apply_transition()
            .withf(|t| {
                t.execution.status == ExecutionStatus::Completed
                    && t.execution.current_step == 2
                    && t.audit.action == AuditAction::Completed
            })
            .times(1)
            .returning(|t| Ok(applied(t)));
        repo.expect_list_active_extensions()
            .withf(|_, event| *event == HookEvent::ProcessCompleted)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let result = complete_step(
            &repo,
            &HookRegistry::default(),
            &viewer_user(),
            9,
            StepActionForm {
                step_index: 1,
                notes: Some("done".to_string()),
            },
        )
        .unwrap();

        assert_eq!(result.execution.status, ExecutionStatus::Completed);
    }

    #[test]
    fn out_of_order_completion_is_rejected() {
        let mut repo = mock_with(
            execution(ExecutionStatus::Active, 0),
            vec![descriptor("Kickoff", false, None), descriptor("Wrap-up", false, None)],
        );
        repo.expect_apply_transition().never();

        let result = complete_step(
            &repo,
            &HookRegistry::default(),
            &viewer_user(),
            9,
            StepActionForm {
                step_index: 1,
                notes: None,
            },
        );

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[test]
    fn approval_needs_the_approver_role() {
        let repo = MockRepository::new();

        let result = decide_approval(
            &repo,
            &viewer_user(),
            9,
            ApprovalForm {
                decision: ApprovalDecision::Approve,
                comment: None,
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn approval_needs_the_steps_own_role() {
        let mut repo = mock_with(
            execution(ExecutionStatus::AwaitingApproval, 0),
            vec![descriptor("Legal review", true, Some("legal"))],
        );
        repo.expect_get_step_at()
            .returning(|_, index| Ok(Some(step(index, StepStatus::AwaitingApproval))));
        repo.expect_apply_transition().never();

        let approver = user_with_roles(&[SERVICE_ACCESS_ROLE, SERVICE_APPROVER_ROLE]);
        let result = decide_approval(
            &repo,
            &approver,
            9,
            ApprovalForm {
                decision: ApprovalDecision::Approve,
                comment: None,
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn rejection_fails_step_and_execution() {
        let mut repo = mock_with(
            execution(ExecutionStatus::AwaitingApproval, 0),
            vec![descriptor("Legal review", true, Some("legal"))],
        );
        repo.expect_get_step_at()
            .returning(|_, index| Ok(Some(step(index, StepStatus::AwaitingApproval))));
        repo.expect_get_pending_approval()
            .returning(|step_id| Ok(Some(pending_approval(step_id))));
        repo.expect_apply_transition()
            .withf(|t| {
                matches!(
                    &t.approval,
                    ApprovalChange::Decide { status: ApprovalStatus::Rejected, decided_by, .. }
                        if decided_by.get() == 5
                ) && matches!(
                    &t.step,
                    StepChange::Update { status: StepStatus::Failed, .. }
                ) && t.execution.status == ExecutionStatus::Failed
                    && t.audit.action == AuditAction::ApprovalRejected
                    && t.audit.details == json!({
                        "step_index": 0,
                        "approval_id": 70,
                        "comment": "missing contract",
                    })
            })
            .times(1)
            .returning(|t| Ok(applied(t)));

        let approver = user_with_roles(&[SERVICE_ACCESS_ROLE, SERVICE_APPROVER_ROLE, "legal"]);
        let result = decide_approval(
            &repo,
            &approver,
            9,
            ApprovalForm {
                decision: ApprovalDecision::Reject,
                comment: Some("missing contract".to_string()),
            },
        )
        .unwrap();

        assert_eq!(result.execution.status, ExecutionStatus::Failed);
    }

    #[test]
    fn terminal_executions_cannot_be_cancelled() {
        let mut repo = MockRepository::new();
        repo.expect_get_execution()
            .returning(|_, _| Ok(Some(execution(ExecutionStatus::Completed, 2))));
        repo.expect_create_or_update_member()
            .returning(|_| Ok(sample_member(5)));
        repo.expect_apply_transition().never();

        let result = cancel_execution(&repo, &viewer_user(), 9, CancelForm::default());

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[test]
    fn cancelling_closes_the_open_step_and_its_approval() {
        let mut repo = mock_with(
            execution(ExecutionStatus::AwaitingApproval, 0),
            vec![descriptor("Legal review", true, None)],
        );
        repo.expect_get_step_at()
            .returning(|_, index| Ok(Some(step(index, StepStatus::AwaitingApproval))));
        repo.expect_get_pending_approval()
            .returning(|step_id| Ok(Some(pending_approval(step_id))));
        repo.expect_apply_transition()
            .withf(|t| {
                matches!(
                    &t.step,
                    StepChange::Update { step_id, status: StepStatus::Cancelled, .. }
                        if step_id.get() == 30
                ) && matches!(
                    &t.approval,
                    ApprovalChange::Decide { approval_id, status: ApprovalStatus::Cancelled, .. }
                        if approval_id.get() == 70
                ) && t.execution.status == ExecutionStatus::Cancelled
                    && t.audit.action == AuditAction::Cancelled
            })
            .times(1)
            .returning(|t| Ok(applied(t)));

        let result = cancel_execution(&repo, &viewer_user(), 9, CancelForm::default()).unwrap();

        assert_eq!(result.execution.status, ExecutionStatus::Cancelled);
    }

    #[test]
    fn failing_an_awaiting_step_cancels_its_approval() {
        let mut repo = mock_with(
            execution(ExecutionStatus::AwaitingApproval, 0),
            vec![descriptor("Legal review", true, None)],
        );
        repo.expect_get_step_at()
            .returning(|_, index| Ok(Some(step(index, StepStatus::AwaitingApproval))));
        repo.expect_get_pending_approval()
            .times(1)
            .returning(|step_id| Ok(Some(pending_approval(step_id))));
        repo.expect_apply_transition()
            .withf(|t| {
                matches!(
                    &t.approval,
                    ApprovalChange::Decide { status: ApprovalStatus::Cancelled, .. }
                ) && matches!(&t.step, StepChange::Update { status: StepStatus::Failed, .. })
                    && t.execution.status == ExecutionStatus::Failed
            })
            .times(1)
            .returning(|t| Ok(applied(t)));

        let result = fail_step(
            &repo,
            &viewer_user(),
            9,
            StepActionForm {
                step_index: 0,
                notes: Some("vendor unreachable".to_string()),
            },
        )
        .unwrap();

        assert_eq!(result.execution.status, ExecutionStatus::Failed);
    }

    #[test]
    fn out_of_range_step_sla_is_refused() {
        let mut oversized = descriptor("Forever", false, None);
        oversized.sla_hours = Some(3_000_000_000);
        let mut repo = mock_with(execution(ExecutionStatus::Pending, 0), vec![oversized]);
        repo.expect_apply_transition().never();

        let result = execute_next_step(&repo, &viewer_user(), 9);

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }
}
