//! Repository implementation for company accounts and merges.

use diesel::prelude::*;

use crate::{
    domain::{
        company::{Company, CompanyMerge, MergeSummary, NewCompany},
        types::{CompanyId, TeamId},
    },
    models::company::{
        Company as DbCompany, MergedCompany as DbMergedCompany, NewCompany as DbNewCompany,
    },
    repository::{
        CompanyReader, CompanyWriter, DieselRepository,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl CompanyReader for DieselRepository {
    fn get_company_by_id(
        &self,
        id: CompanyId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<Company>> {
        use crate::schema::companies;

        let mut conn = self.conn()?;
        let db_company = companies::table
            .filter(companies::id.eq(id.get()))
            .filter(companies::team_id.eq(team_id.get()))
            .first::<DbCompany>(&mut conn)
            .optional()?;

        match db_company {
            Some(db_company) => Ok(Some(Company::try_from(db_company)?)),
            None => Ok(None),
        }
    }

    fn list_companies(&self, team_id: TeamId) -> RepositoryResult<Vec<Company>> {
        use crate::schema::companies;

        let mut conn = self.conn()?;
        companies::table
            .filter(companies::team_id.eq(team_id.get()))
            .filter(companies::deleted_at.is_null())
            .order(companies::id.asc())
            .load::<DbCompany>(&mut conn)?
            .into_iter()
            .map(|row| Company::try_from(row).map_err(RepositoryError::from))
            .collect()
    }
}

impl CompanyWriter for DieselRepository {
    fn create_company(&self, new_company: &NewCompany) -> RepositoryResult<Company> {
        use crate::schema::companies;

        let mut conn = self.conn()?;
        let db_new_company: DbNewCompany = new_company.into();

        let db_company = diesel::insert_into(companies::table)
            .values(&db_new_company)
            .get_result::<DbCompany>(&mut conn)?;

        Ok(Company::try_from(db_company)?)
    }

    fn merge_companies(&self, merge: &CompanyMerge) -> RepositoryResult<MergeSummary> {
        use crate::schema::{companies, leads, opportunities, support_cases};

        let mut conn = self.conn()?;
        let team_id = merge.team_id.get();
        let primary_id = merge.primary_id.get();
        let duplicate_id = merge.duplicate_id.get();
        let now = merge.merged_at;

        conn.transaction::<MergeSummary, RepositoryError, _>(|conn| {
            // Soft-delete first so a concurrent merge of the same duplicate
            // finds nothing to update.
            let retired = diesel::update(
                companies::table
                    .filter(companies::id.eq(duplicate_id))
                    .filter(companies::team_id.eq(team_id))
                    .filter(companies::deleted_at.is_null()),
            )
            .set((
                companies::merged_into_id.eq(primary_id),
                companies::deleted_at.eq(now),
                companies::updated_at.eq(now),
            ))
            .execute(conn)?;
            if retired == 0 {
                return Err(RepositoryError::Conflict(
                    "duplicate company is no longer mergeable".to_string(),
                ));
            }

            let db_company = diesel::update(
                companies::table
                    .filter(companies::id.eq(primary_id))
                    .filter(companies::team_id.eq(team_id))
                    .filter(companies::deleted_at.is_null()),
            )
            .set(&DbMergedCompany::new(&merge.fields, now))
            .get_result::<DbCompany>(conn)?;

            let reattached_opportunities = diesel::update(
                opportunities::table
                    .filter(opportunities::team_id.eq(team_id))
                    .filter(opportunities::company_id.eq(duplicate_id)),
            )
            .set((
                opportunities::company_id.eq(primary_id),
                opportunities::updated_at.eq(now),
            ))
            .execute(conn)?;

            let reattached_cases = diesel::update(
                support_cases::table
                    .filter(support_cases::team_id.eq(team_id))
                    .filter(support_cases::company_id.eq(duplicate_id)),
            )
            .set((
                support_cases::company_id.eq(primary_id),
                support_cases::updated_at.eq(now),
            ))
            .execute(conn)?;

            let reattached_leads = diesel::update(
                leads::table
                    .filter(leads::team_id.eq(team_id))
                    .filter(leads::converted_company_id.eq(duplicate_id)),
            )
            .set((
                leads::converted_company_id.eq(primary_id),
                leads::updated_at.eq(now),
            ))
            .execute(conn)?;

            Ok(MergeSummary {
                company: Company::try_from(db_company)?,
                reattached_opportunities,
                reattached_cases,
                reattached_leads,
            })
        })
    }
}
