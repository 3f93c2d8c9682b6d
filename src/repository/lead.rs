//! Repository implementation for leads, assignment and conversion.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        company::NewCompany,
        lead::{
            ConversionTarget, ConvertedLead, Lead, LeadConversion, LeadMerge, LeadStatus, NewLead,
        },
        opportunity::NewOpportunity,
        types::{CompanyDomain, CompanyId, LeadId, MemberId, OpportunityId, TeamId},
    },
    models::{
        company::{Company as DbCompany, NewCompany as DbNewCompany},
        lead::{Lead as DbLead, MergedLead as DbMergedLead, NewLead as DbNewLead},
        member::AssignmentCursor,
        opportunity::{NewOpportunity as DbNewOpportunity, Opportunity as DbOpportunity},
    },
    repository::{
        DieselRepository, LeadListQuery, LeadReader, LeadWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn open_status_labels() -> Vec<&'static str> {
    LeadStatus::OPEN.iter().map(|s| s.as_str()).collect()
}

impl LeadReader for DieselRepository {
    fn get_lead_by_id(&self, id: LeadId, team_id: TeamId) -> RepositoryResult<Option<Lead>> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let db_lead = leads::table
            .filter(leads::id.eq(id.get()))
            .filter(leads::team_id.eq(team_id.get()))
            .first::<DbLead>(&mut conn)
            .optional()?;

        match db_lead {
            Some(db_lead) => Ok(Some(Lead::try_from(db_lead)?)),
            None => Ok(None),
        }
    }

    fn list_leads(&self, query: LeadListQuery) -> RepositoryResult<(usize, Vec<Lead>)> {
        use crate::schema::leads;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = leads::table
                .filter(leads::team_id.eq(query.team_id.get()))
                .filter(leads::deleted_at.is_null())
                .into_boxed::<diesel::sqlite::Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(leads::status.eq(status.as_str()));
            }
            if let Some(member_id) = query.assigned_to {
                items = items.filter(leads::assigned_to.eq(member_id.get()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder();
        if let Some(pagination) = &query.pagination {
            items = items.offset(pagination.offset()).limit(pagination.limit());
        }

        let leads = items
            .order(leads::id.desc())
            .load::<DbLead>(&mut conn)?
            .into_iter()
            .map(|row| Lead::try_from(row).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<Lead>>>()?;

        Ok((total, leads))
    }

    fn list_all_leads(&self, team_id: TeamId) -> RepositoryResult<Vec<Lead>> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        leads::table
            .filter(leads::team_id.eq(team_id.get()))
            .filter(leads::deleted_at.is_null())
            .order(leads::id.asc())
            .load::<DbLead>(&mut conn)?
            .into_iter()
            .map(|row| Lead::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    fn count_open_leads(&self, team_id: TeamId) -> RepositoryResult<HashMap<MemberId, i64>> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let counts = leads::table
            .filter(leads::team_id.eq(team_id.get()))
            .filter(leads::deleted_at.is_null())
            .filter(leads::status.eq_any(open_status_labels()))
            .filter(leads::assigned_to.is_not_null())
            .group_by(leads::assigned_to)
            .select((leads::assigned_to, diesel::dsl::count_star()))
            .load::<(Option<i32>, i64)>(&mut conn)?;

        let mut loads = HashMap::new();
        for (member_id, count) in counts {
            if let Some(member_id) = member_id {
                loads.insert(MemberId::try_from(member_id)?, count);
            }
        }
        Ok(loads)
    }

    fn get_assignment_cursor(&self, team_id: TeamId) -> RepositoryResult<Option<MemberId>> {
        use crate::schema::assignment_cursors;

        let mut conn = self.conn()?;
        let last = assignment_cursors::table
            .filter(assignment_cursors::team_id.eq(team_id.get()))
            .select(assignment_cursors::last_member_id)
            .first::<i32>(&mut conn)
            .optional()?;

        Ok(last.map(MemberId::try_from).transpose()?)
    }
}

impl LeadWriter for DieselRepository {
    fn create_lead(&self, new_lead: &NewLead) -> RepositoryResult<Lead> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let db_new_lead: DbNewLead = new_lead.into();

        let db_lead = diesel::insert_into(leads::table)
            .values(&db_new_lead)
            .get_result::<DbLead>(&mut conn)?;

        Ok(Lead::try_from(db_lead)?)
    }

    fn create_leads(&self, new_leads: &[NewLead]) -> RepositoryResult<usize> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let insertables: Vec<DbNewLead> = new_leads.iter().map(Into::into).collect();

        conn.transaction::<usize, RepositoryError, _>(|conn| {
            let mut inserted = 0;
            for lead in &insertables {
                inserted += diesel::insert_into(leads::table)
                    .values(lead)
                    .execute(conn)?;
            }
            Ok(inserted)
        })
    }

    fn assign_lead(
        &self,
        id: LeadId,
        team_id: TeamId,
        member_id: MemberId,
        save_cursor: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<Lead> {
        use crate::schema::{assignment_cursors, leads};

        let mut conn = self.conn()?;

        conn.transaction::<Lead, RepositoryError, _>(|conn| {
            let db_lead = diesel::update(
                leads::table
                    .filter(leads::id.eq(id.get()))
                    .filter(leads::team_id.eq(team_id.get()))
                    .filter(leads::deleted_at.is_null())
                    .filter(leads::converted_at.is_null()),
            )
            .set((
                leads::assigned_to.eq(member_id.get()),
                leads::updated_at.eq(now),
            ))
            .get_result::<DbLead>(conn)?;

            if save_cursor {
                let cursor = AssignmentCursor {
                    team_id: team_id.get(),
                    last_member_id: member_id.get(),
                    updated_at: now,
                };
                diesel::insert_into(assignment_cursors::table)
                    .values(&cursor)
                    .on_conflict(assignment_cursors::team_id)
                    .do_update()
                    .set((
                        assignment_cursors::last_member_id
                            .eq(excluded(assignment_cursors::last_member_id)),
                        assignment_cursors::updated_at.eq(excluded(assignment_cursors::updated_at)),
                    ))
                    .execute(conn)?;
            }

            Ok(Lead::try_from(db_lead)?)
        })
    }

    fn update_lead_status(
        &self,
        id: LeadId,
        team_id: TeamId,
        status: LeadStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<Lead> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let db_lead = diesel::update(
            leads::table
                .filter(leads::id.eq(id.get()))
                .filter(leads::team_id.eq(team_id.get()))
                .filter(leads::deleted_at.is_null())
                .filter(leads::converted_at.is_null()),
        )
        .set((leads::status.eq(status.as_str()), leads::updated_at.eq(now)))
        .get_result::<DbLead>(&mut conn)?;

        Ok(Lead::try_from(db_lead)?)
    }

    fn convert_lead(&self, conversion: &LeadConversion) -> RepositoryResult<ConvertedLead> {
        use crate::schema::{companies, leads, opportunities};

        let mut conn = self.conn()?;
        let team_id = conversion.team_id.get();
        let now = conversion.converted_at;

        conn.transaction::<ConvertedLead, RepositoryError, _>(|conn| {
            let lead: Lead = leads::table
                .filter(leads::id.eq(conversion.lead_id.get()))
                .filter(leads::team_id.eq(team_id))
                .filter(leads::deleted_at.is_null())
                .first::<DbLead>(conn)?
                .try_into()?;

            if lead.is_converted() {
                return Err(RepositoryError::Conflict(
                    "lead has already been converted".to_string(),
                ));
            }

            let company_id = match &conversion.target {
                ConversionTarget::ExistingCompany(company_id) => companies::table
                    .filter(companies::id.eq(company_id.get()))
                    .filter(companies::team_id.eq(team_id))
                    .filter(companies::deleted_at.is_null())
                    .select(companies::id)
                    .first::<i32>(conn)?,
                ConversionTarget::NewCompany(name) => {
                    let new_company = NewCompany {
                        domain: lead
                            .website
                            .as_deref()
                            .and_then(|w| CompanyDomain::new(w).ok())
                            .or_else(|| {
                                lead.email
                                    .as_ref()
                                    .and_then(|e| CompanyDomain::new(e.domain()).ok())
                            }),
                        email: lead.email.clone(),
                        phone: lead.phone.clone(),
                        industry: lead.industry.clone(),
                        country: lead.country.clone(),
                        owner_id: conversion.owner_id,
                        ..NewCompany::named(conversion.team_id, name.clone())
                    };
                    let db_new_company: DbNewCompany = (&new_company).into();
                    diesel::insert_into(companies::table)
                        .values(&db_new_company)
                        .get_result::<DbCompany>(conn)?
                        .id
                }
            };

            let opportunity_id = match &conversion.opportunity {
                Some((name, amount_cents)) => {
                    let new_opportunity = NewOpportunity {
                        team_id: conversion.team_id,
                        company_id: Some(CompanyId::try_from(company_id)?),
                        name: name.clone(),
                        amount_cents: *amount_cents,
                        owner_id: conversion.owner_id,
                    };
                    let db_new_opportunity: DbNewOpportunity = (&new_opportunity).into();
                    let db_opportunity = diesel::insert_into(opportunities::table)
                        .values(&db_new_opportunity)
                        .get_result::<DbOpportunity>(conn)?;
                    Some(db_opportunity.id)
                }
                None => None,
            };

            let db_lead = diesel::update(leads::table.filter(leads::id.eq(lead.id.get())))
                .set((
                    leads::status.eq(LeadStatus::Converted.as_str()),
                    leads::converted_at.eq(now),
                    leads::converted_company_id.eq(company_id),
                    leads::converted_opportunity_id.eq(opportunity_id),
                    leads::updated_at.eq(now),
                ))
                .get_result::<DbLead>(conn)?;

            Ok(ConvertedLead {
                lead: Lead::try_from(db_lead)?,
                company_id: CompanyId::try_from(company_id)?,
                opportunity_id: opportunity_id.map(OpportunityId::try_from).transpose()?,
            })
        })
    }

    fn delete_lead(&self, id: LeadId, team_id: TeamId, now: NaiveDateTime) -> RepositoryResult<()> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let affected = diesel::update(
            leads::table
                .filter(leads::id.eq(id.get()))
                .filter(leads::team_id.eq(team_id.get()))
                .filter(leads::deleted_at.is_null()),
        )
        .set(leads::deleted_at.eq(now))
        .execute(&mut conn)?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn merge_leads(&self, merge: &LeadMerge) -> RepositoryResult<Lead> {
        use crate::schema::leads;

        let mut conn = self.conn()?;
        let team_id = merge.team_id.get();
        let primary_id = merge.primary_id.get();
        let duplicate_id = merge.duplicate_id.get();
        let now = merge.merged_at;

        conn.transaction::<Lead, RepositoryError, _>(|conn| {
            let retired = diesel::update(
                leads::table
                    .filter(leads::id.eq(duplicate_id))
                    .filter(leads::team_id.eq(team_id))
                    .filter(leads::deleted_at.is_null())
                    .filter(leads::converted_at.is_null()),
            )
            .set((
                leads::merged_into_id.eq(primary_id),
                leads::deleted_at.eq(now),
                leads::updated_at.eq(now),
            ))
            .execute(conn)?;
            if retired == 0 {
                return Err(RepositoryError::Conflict(
                    "duplicate lead is no longer mergeable".to_string(),
                ));
            }

            let db_lead = diesel::update(
                leads::table
                    .filter(leads::id.eq(primary_id))
                    .filter(leads::team_id.eq(team_id))
                    .filter(leads::deleted_at.is_null())
                    .filter(leads::converted_at.is_null()),
            )
            .set(&DbMergedLead::new(&merge.fields, now))
            .get_result::<DbLead>(conn)
            .optional()?
            .ok_or_else(|| {
                RepositoryError::Conflict("primary lead is no longer mergeable".to_string())
            })?;

            Ok(Lead::try_from(db_lead)?)
        })
    }
}
