use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    domain::process::{
        AppliedTransition, ApprovalChange, ApprovalStatus, AuditLogEntry, ExecutionStatus,
        NewAuditEntry,
        NewProcessDefinition, NewProcessExecution, ProcessApproval, ProcessDefinition,
        ProcessExecution, ProcessStep, ProcessTransition, StepChange, StepStatus,
    },
    domain::types::{ProcessDefinitionId, ProcessExecutionId, ProcessStepId, TeamId},
    models::process::{
        ExecutionChange, NewProcessApproval, NewProcessAuditLog,
        NewProcessDefinition as DbNewProcessDefinition,
        NewProcessExecution as DbNewProcessExecution, NewProcessStep as DbNewProcessStep,
        ProcessApproval as DbProcessApproval, ProcessAuditLog as DbProcessAuditLog,
        ProcessDefinition as DbProcessDefinition, ProcessExecution as DbProcessExecution,
        ProcessStep as DbProcessStep,
    },
    repository::{
        DieselRepository, ProcessReader, ProcessWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn open_step_labels() -> Vec<&'static str> {
    [StepStatus::InProgress, StepStatus::AwaitingApproval]
        .iter()
        .map(|s| s.as_str())
        .collect()
}

fn terminal_execution_labels() -> Vec<&'static str> {
    ExecutionStatus::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .map(|s| s.as_str())
        .collect()
}

impl ProcessReader for DieselRepository {
    fn get_definition(
        &self,
        id: ProcessDefinitionId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<ProcessDefinition>> {
        use crate::schema::process_definitions;

        let mut conn = self.conn()?;
        let row = process_definitions::table
            .filter(process_definitions::id.eq(id.get()))
            .filter(process_definitions::team_id.eq(team_id.get()))
            .first::<DbProcessDefinition>(&mut conn)
            .optional()?;

        match row {
            Some(row) => Ok(Some(ProcessDefinition::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn list_definitions(&self, team_id: TeamId) -> RepositoryResult<Vec<ProcessDefinition>> {
        use crate::schema::process_definitions;

        let mut conn = self.conn()?;
        process_definitions::table
            .filter(process_definitions::team_id.eq(team_id.get()))
            .order(process_definitions::id.asc())
            .load::<DbProcessDefinition>(&mut conn)?
            .into_iter()
            .map(|row| ProcessDefinition::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    fn get_execution(
        &self,
        id: ProcessExecutionId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<ProcessExecution>> {
        use crate::schema::process_executions;

        let mut conn = self.conn()?;
        let row = process_executions::table
            .filter(process_executions::id.eq(id.get()))
            .filter(process_executions::team_id.eq(team_id.get()))
            .first::<DbProcessExecution>(&mut conn)
            .optional()?;

        match row {
            Some(row) => Ok(Some(ProcessExecution::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn list_steps(&self, execution_id: ProcessExecutionId) -> RepositoryResult<Vec<ProcessStep>> {
        use crate::schema::process_steps;

        let mut conn = self.conn()?;
        process_steps::table
            .filter(process_steps::execution_id.eq(execution_id.get()))
            .order(process_steps::step_index.asc())
            .load::<DbProcessStep>(&mut conn)?
            .into_iter()
            .map(|row| ProcessStep::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    fn get_step_at(
        &self,
        execution_id: ProcessExecutionId,
        step_index: i32,
    ) -> RepositoryResult<Option<ProcessStep>> {
        use crate::schema::process_steps;

        let mut conn = self.conn()?;
        let row = process_steps::table
            .filter(process_steps::execution_id.eq(execution_id.get()))
            .filter(process_steps::step_index.eq(step_index))
            .first::<DbProcessStep>(&mut conn)
            .optional()?;

        match row {
            Some(row) => Ok(Some(ProcessStep::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn get_pending_approval(
        &self,
        step_id: ProcessStepId,
    ) -> RepositoryResult<Option<ProcessApproval>> {
        use crate::schema::process_approvals;

        let mut conn = self.conn()?;
        let row = process_approvals::table
            .filter(process_approvals::step_id.eq(step_id.get()))
            .filter(process_approvals::status.eq(ApprovalStatus::Pending.as_str()))
            .order(process_approvals::id.desc())
            .first::<DbProcessApproval>(&mut conn)
            .optional()?;

        match row {
            Some(row) => Ok(Some(ProcessApproval::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn list_audit_log(
        &self,
        execution_id: ProcessExecutionId,
    ) -> RepositoryResult<Vec<AuditLogEntry>> {
        use crate::schema::process_audit_logs;

        let mut conn = self.conn()?;
        process_audit_logs::table
            .filter(process_audit_logs::execution_id.eq(execution_id.get()))
            .order(process_audit_logs::id.asc())
            .load::<DbProcessAuditLog>(&mut conn)?
            .into_iter()
            .map(|row| AuditLogEntry::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    fn list_overdue_steps(
        &self,
        team_id: Option<TeamId>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<(ProcessExecution, ProcessStep)>> {
        use crate::schema::{process_executions, process_steps};

        let mut conn = self.conn()?;
        let mut query = process_steps::table
            .inner_join(process_executions::table)
            .filter(process_steps::due_at.lt(now))
            .filter(process_steps::status.eq_any(open_step_labels()))
            .filter(process_executions::status.ne_all(terminal_execution_labels()))
            .select((process_executions::all_columns, process_steps::all_columns))
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(team_id) = team_id {
            query = query.filter(process_executions::team_id.eq(team_id.get()));
        }

        query
            .order(process_steps::due_at.asc())
            .load::<(DbProcessExecution, DbProcessStep)>(&mut conn)?
            .into_iter()
            .map(|(execution, step)| -> RepositoryResult<_> {
                Ok((
                    ProcessExecution::try_from(execution)?,
                    ProcessStep::try_from(step)?,
                ))
            })
            .collect()
    }
}

impl ProcessWriter for DieselRepository {
    fn create_definition(
        &self,
        new_definition: &NewProcessDefinition,
    ) -> RepositoryResult<ProcessDefinition> {
        use crate::schema::process_definitions;

        let mut conn = self.conn()?;
        let db_new_definition = DbNewProcessDefinition::try_from(new_definition)?;

        let row = diesel::insert_into(process_definitions::table)
            .values(&db_new_definition)
            .get_result::<DbProcessDefinition>(&mut conn)?;

        Ok(ProcessDefinition::try_from(row)?)
    }

    fn start_execution(
        &self,
        new_execution: &NewProcessExecution,
        audit: &NewAuditEntry,
    ) -> RepositoryResult<ProcessExecution> {
        use crate::schema::{process_audit_logs, process_executions};

        let mut conn = self.conn()?;
        let db_new_execution: DbNewProcessExecution = new_execution.into();

        conn.transaction::<ProcessExecution, RepositoryError, _>(|conn| {
            let row = diesel::insert_into(process_executions::table)
                .values(&db_new_execution)
                .get_result::<DbProcessExecution>(conn)?;
            let execution = ProcessExecution::try_from(row)?;

            diesel::insert_into(process_audit_logs::table)
                .values(&NewProcessAuditLog::new(execution.id, audit)?)
                .execute(conn)?;

            Ok(execution)
        })
    }

    fn apply_transition(
        &self,
        transition: &ProcessTransition,
    ) -> RepositoryResult<AppliedTransition> {
        use crate::schema::{process_approvals, process_audit_logs, process_executions, process_steps};

        let mut conn = self.conn()?;
        let execution_id = transition.execution_id;

        conn.transaction::<AppliedTransition, RepositoryError, _>(|conn| {
            let step = match &transition.step {
                StepChange::Unchanged => None,
                StepChange::Insert(new_step) => Some(
                    diesel::insert_into(process_steps::table)
                        .values(&DbNewProcessStep::new(execution_id, new_step))
                        .get_result::<DbProcessStep>(conn)?,
                ),
                StepChange::Update {
                    step_id,
                    status,
                    completed_at,
                    notes,
                } => {
                    let row = diesel::update(
                        process_steps::table
                            .filter(process_steps::id.eq(step_id.get()))
                            .filter(process_steps::execution_id.eq(execution_id.get()))
                            .filter(process_steps::status.eq_any(open_step_labels())),
                    )
                    .set((
                        process_steps::status.eq(status.as_str()),
                        process_steps::completed_at.eq(completed_at),
                        process_steps::notes.eq(notes.as_ref().map(|n| n.as_str())),
                    ))
                    .get_result::<DbProcessStep>(conn)
                    .optional()?
                    .ok_or_else(|| RepositoryError::Conflict("step is no longer open".to_string()))?;
                    Some(row)
                }
            };

            let approval = match &transition.approval {
                ApprovalChange::Unchanged => None,
                ApprovalChange::Request { requested_at } => {
                    let step_id = step.as_ref().map(|s| s.id).ok_or_else(|| {
                        RepositoryError::Unexpected(
                            "approval requested without a new step".to_string(),
                        )
                    })?;
                    Some(
                        diesel::insert_into(process_approvals::table)
                            .values(&NewProcessApproval {
                                execution_id: execution_id.get(),
                                step_id,
                                status: ApprovalStatus::Pending.as_str(),
                                requested_at: *requested_at,
                            })
                            .get_result::<DbProcessApproval>(conn)?,
                    )
                }
                ApprovalChange::Decide {
                    approval_id,
                    status,
                    decided_by,
                    decided_at,
                    comment,
                } => Some(
                    diesel::update(
                        process_approvals::table
                            .filter(process_approvals::id.eq(approval_id.get()))
                            .filter(
                                process_approvals::status.eq(ApprovalStatus::Pending.as_str()),
                            ),
                    )
                    .set((
                        process_approvals::status.eq(status.as_str()),
                        process_approvals::decided_by.eq(decided_by.get()),
                        process_approvals::decided_at.eq(decided_at),
                        process_approvals::comment.eq(comment.as_ref().map(|c| c.as_str())),
                    ))
                    .get_result::<DbProcessApproval>(conn)
                    .optional()?
                    .ok_or_else(|| {
                        RepositoryError::Conflict("approval was already decided".to_string())
                    })?,
                ),
            };

            let execution = diesel::update(
                process_executions::table.filter(process_executions::id.eq(execution_id.get())),
            )
            .set(&ExecutionChange {
                status: transition.execution.status.as_str(),
                current_step: transition.execution.current_step,
                completed_at: transition.execution.completed_at,
            })
            .get_result::<DbProcessExecution>(conn)?;

            diesel::insert_into(process_audit_logs::table)
                .values(&NewProcessAuditLog::new(execution_id, &transition.audit)?)
                .execute(conn)?;

            Ok(AppliedTransition {
                execution: ProcessExecution::try_from(execution)?,
                step: step.map(ProcessStep::try_from).transpose()?,
                approval: approval.map(ProcessApproval::try_from).transpose()?,
            })
        })
    }
}
