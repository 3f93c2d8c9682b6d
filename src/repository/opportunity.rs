use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    domain::{
        opportunity::{NewOpportunity, Opportunity, StageChange},
        types::{CompanyId, OpportunityId, TeamId},
    },
    models::opportunity::{NewOpportunity as DbNewOpportunity, Opportunity as DbOpportunity},
    repository::{
        DieselRepository, OpportunityReader, OpportunityWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl OpportunityReader for DieselRepository {
    fn get_opportunity_by_id(
        &self,
        id: OpportunityId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<Opportunity>> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;
        let db_opportunity = opportunities::table
            .filter(opportunities::id.eq(id.get()))
            .filter(opportunities::team_id.eq(team_id.get()))
            .first::<DbOpportunity>(&mut conn)
            .optional()?;

        match db_opportunity {
            Some(db_opportunity) => Ok(Some(Opportunity::try_from(db_opportunity)?)),
            None => Ok(None),
        }
    }

    fn list_opportunities(
        &self,
        team_id: TeamId,
        company_id: Option<CompanyId>,
    ) -> RepositoryResult<Vec<Opportunity>> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;
        let mut query = opportunities::table
            .filter(opportunities::team_id.eq(team_id.get()))
            .filter(opportunities::deleted_at.is_null())
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(company_id) = company_id {
            query = query.filter(opportunities::company_id.eq(company_id.get()));
        }

        query
            .order(opportunities::id.asc())
            .load::<DbOpportunity>(&mut conn)?
            .into_iter()
            .map(|row| Opportunity::try_from(row).map_err(RepositoryError::from))
            .collect()
    }
}

impl OpportunityWriter for DieselRepository {
    fn create_opportunity(
        &self,
        new_opportunity: &NewOpportunity,
    ) -> RepositoryResult<Opportunity> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;
        let db_new_opportunity: DbNewOpportunity = new_opportunity.into();

        let db_opportunity = diesel::insert_into(opportunities::table)
            .values(&db_new_opportunity)
            .get_result::<DbOpportunity>(&mut conn)?;

        Ok(Opportunity::try_from(db_opportunity)?)
    }

    fn update_opportunity_stage(
        &self,
        id: OpportunityId,
        team_id: TeamId,
        change: &StageChange,
        now: NaiveDateTime,
    ) -> RepositoryResult<Opportunity> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;

        // Guarded on the stage the change was planned from.
        let db_opportunity = diesel::update(
            opportunities::table
                .filter(opportunities::id.eq(id.get()))
                .filter(opportunities::team_id.eq(team_id.get()))
                .filter(opportunities::stage.eq(change.from.as_str()))
                .filter(opportunities::deleted_at.is_null()),
        )
        .set((
            opportunities::stage.eq(change.stage.as_str()),
            opportunities::probability.eq(change.probability),
            opportunities::closed_at.eq(change.closed_at),
            opportunities::updated_at.eq(now),
        ))
        .get_result::<DbOpportunity>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("opportunity stage changed".to_string()))?;

        Ok(Opportunity::try_from(db_opportunity)?)
    }
}
