use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    domain::{
        support_case::{CasePriority, CaseStatus, NewSupportCase, SupportCase},
        types::{SupportCaseId, TeamId},
    },
    models::support_case::{NewSupportCase as DbNewSupportCase, SupportCase as DbSupportCase},
    repository::{
        DieselRepository, SupportCaseReader, SupportCaseWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn finished_labels() -> Vec<&'static str> {
    CaseStatus::FINISHED.iter().map(|s| s.as_str()).collect()
}

fn into_domain(rows: Vec<DbSupportCase>) -> RepositoryResult<Vec<SupportCase>> {
    rows.into_iter()
        .map(|row| SupportCase::try_from(row).map_err(RepositoryError::from))
        .collect()
}

impl SupportCaseReader for DieselRepository {
    fn get_case_by_id(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<SupportCase>> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let db_case = support_cases::table
            .filter(support_cases::id.eq(id.get()))
            .filter(support_cases::team_id.eq(team_id.get()))
            .filter(support_cases::deleted_at.is_null())
            .first::<DbSupportCase>(&mut conn)
            .optional()?;

        match db_case {
            Some(db_case) => Ok(Some(SupportCase::try_from(db_case)?)),
            None => Ok(None),
        }
    }

    fn list_cases(&self, team_id: TeamId) -> RepositoryResult<Vec<SupportCase>> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let rows = support_cases::table
            .filter(support_cases::team_id.eq(team_id.get()))
            .filter(support_cases::deleted_at.is_null())
            .order(support_cases::due_at.asc())
            .load::<DbSupportCase>(&mut conn)?;

        into_domain(rows)
    }

    fn list_breached_cases(
        &self,
        team_id: Option<TeamId>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<SupportCase>> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let mut query = support_cases::table
            .filter(support_cases::due_at.lt(now))
            .filter(support_cases::status.ne_all(finished_labels()))
            .filter(support_cases::deleted_at.is_null())
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(team_id) = team_id {
            query = query.filter(support_cases::team_id.eq(team_id.get()));
        }

        let rows = query
            .order(support_cases::due_at.asc())
            .load::<DbSupportCase>(&mut conn)?;

        into_domain(rows)
    }
}

impl SupportCaseWriter for DieselRepository {
    fn create_case(
        &self,
        new_case: &NewSupportCase,
        opened_at: NaiveDateTime,
    ) -> RepositoryResult<SupportCase> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let db_new_case = DbNewSupportCase::new(new_case, opened_at);

        let db_case = diesel::insert_into(support_cases::table)
            .values(&db_new_case)
            .get_result::<DbSupportCase>(&mut conn)?;

        Ok(SupportCase::try_from(db_case)?)
    }

    fn escalate_case(
        &self,
        id: SupportCaseId,
        level: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;

        // The level guard keeps escalation monotonic under concurrent sweeps.
        let db_case = diesel::update(
            support_cases::table
                .filter(support_cases::id.eq(id.get()))
                .filter(support_cases::escalation_level.lt(level)),
        )
        .set((
            support_cases::escalation_level.eq(level),
            support_cases::escalated_at.eq(now),
            support_cases::updated_at.eq(now),
        ))
        .get_result::<DbSupportCase>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("case already escalated".to_string()))?;

        Ok(SupportCase::try_from(db_case)?)
    }

    fn resolve_case(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let db_case = diesel::update(
            support_cases::table
                .filter(support_cases::id.eq(id.get()))
                .filter(support_cases::team_id.eq(team_id.get()))
                .filter(support_cases::deleted_at.is_null()),
        )
        .set((
            support_cases::status.eq(CaseStatus::Resolved.as_str()),
            support_cases::resolved_at.eq(now),
            support_cases::updated_at.eq(now),
        ))
        .get_result::<DbSupportCase>(&mut conn)?;

        Ok(SupportCase::try_from(db_case)?)
    }

    fn update_case_priority(
        &self,
        id: SupportCaseId,
        team_id: TeamId,
        priority: CasePriority,
        due_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> RepositoryResult<SupportCase> {
        use crate::schema::support_cases;

        let mut conn = self.conn()?;
        let db_case = diesel::update(
            support_cases::table
                .filter(support_cases::id.eq(id.get()))
                .filter(support_cases::team_id.eq(team_id.get()))
                .filter(support_cases::deleted_at.is_null()),
        )
        .set((
            support_cases::priority.eq(priority.as_str()),
            support_cases::due_at.eq(due_at),
            support_cases::updated_at.eq(now),
        ))
        .get_result::<DbSupportCase>(&mut conn)?;

        Ok(SupportCase::try_from(db_case)?)
    }
}
