use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::opportunity::{
    NewOpportunity as DomainNewOpportunity, Opportunity as DomainOpportunity, OpportunityStage,
};
use crate::domain::types::{OpportunityId, OpportunityName, TeamId, TypeConstraintError};
use crate::models::optional_id;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::opportunities)]
/// Diesel model for [`crate::domain::opportunity::Opportunity`].
pub struct Opportunity {
    pub id: i32,
    pub team_id: i32,
    pub company_id: Option<i32>,
    pub name: String,
    pub amount_cents: i64,
    pub stage: String,
    pub probability: i32,
    pub owner_id: Option<i32>,
    pub closed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::opportunities)]
/// Insertable form of [`Opportunity`].
pub struct NewOpportunity<'a> {
    pub team_id: i32,
    pub company_id: Option<i32>,
    pub name: &'a str,
    pub amount_cents: i64,
    pub stage: &'a str,
    pub probability: i32,
    pub owner_id: Option<i32>,
}

impl TryFrom<Opportunity> for DomainOpportunity {
    type Error = TypeConstraintError;

    fn try_from(opportunity: Opportunity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OpportunityId::try_from(opportunity.id)?,
            team_id: TeamId::try_from(opportunity.team_id)?,
            company_id: optional_id(opportunity.company_id)?,
            name: OpportunityName::new(opportunity.name)?,
            amount_cents: opportunity.amount_cents,
            stage: OpportunityStage::try_from(opportunity.stage)?,
            probability: opportunity.probability,
            owner_id: optional_id(opportunity.owner_id)?,
            closed_at: opportunity.closed_at,
            created_at: opportunity.created_at,
            updated_at: opportunity.updated_at,
            deleted_at: opportunity.deleted_at,
        })
    }
}

impl<'a> From<&'a DomainNewOpportunity> for NewOpportunity<'a> {
    fn from(opportunity: &'a DomainNewOpportunity) -> Self {
        let stage = DomainNewOpportunity::STARTING_STAGE;
        Self {
            team_id: opportunity.team_id.get(),
            company_id: opportunity.company_id.map(|id| id.get()),
            name: opportunity.name.as_str(),
            amount_cents: opportunity.amount_cents,
            stage: stage.as_str(),
            probability: stage.default_probability(),
            owner_id: opportunity.owner_id.map(|id| id.get()),
        }
    }
}
