use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::lead::{
    Lead as DomainLead, LeadStatus, MergedLeadFields, NewLead as DomainNewLead,
};
use crate::domain::types::{
    EmailAddress, LeadId, LeadName, PhoneNumber, TeamId, TypeConstraintError,
};
use crate::models::optional_id;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::leads)]
/// Diesel model for [`crate::domain::lead::Lead`].
pub struct Lead {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub status: String,
    pub assigned_to: Option<i32>,
    pub converted_at: Option<NaiveDateTime>,
    pub converted_company_id: Option<i32>,
    pub converted_opportunity_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
    pub merged_into_id: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::leads)]
/// Insertable form of [`Lead`].
pub struct NewLead<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub company_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub source: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub country: Option<&'a str>,
    pub region: Option<&'a str>,
    pub city: Option<&'a str>,
    pub status: &'a str,
}

impl TryFrom<Lead> for DomainLead {
    type Error = TypeConstraintError;

    fn try_from(lead: Lead) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LeadId::try_from(lead.id)?,
            team_id: TeamId::try_from(lead.team_id)?,
            name: LeadName::new(lead.name)?,
            company_name: lead.company_name,
            email: lead.email.map(EmailAddress::new).transpose()?,
            phone: lead.phone.map(PhoneNumber::from_stored),
            website: lead.website,
            source: lead.source,
            industry: lead.industry,
            country: lead.country,
            region: lead.region,
            city: lead.city,
            status: LeadStatus::try_from(lead.status)?,
            assigned_to: optional_id(lead.assigned_to)?,
            converted_at: lead.converted_at,
            converted_company_id: optional_id(lead.converted_company_id)?,
            converted_opportunity_id: optional_id(lead.converted_opportunity_id)?,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
            deleted_at: lead.deleted_at,
            merged_into_id: optional_id(lead.merged_into_id)?,
        })
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::leads, treat_none_as_null = true)]
/// Column values written to the surviving lead of a merge.
pub struct MergedLead<'a> {
    pub name: &'a str,
    pub company_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub source: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub country: Option<&'a str>,
    pub region: Option<&'a str>,
    pub city: Option<&'a str>,
    pub assigned_to: Option<i32>,
    pub updated_at: NaiveDateTime,
}

impl<'a> MergedLead<'a> {
    pub fn new(fields: &'a MergedLeadFields, updated_at: NaiveDateTime) -> Self {
        Self {
            name: fields.name.as_str(),
            company_name: fields.company_name.as_deref(),
            email: fields.email.as_ref().map(EmailAddress::as_str),
            phone: fields.phone.as_ref().map(PhoneNumber::as_str),
            website: fields.website.as_deref(),
            source: fields.source.as_deref(),
            industry: fields.industry.as_deref(),
            country: fields.country.as_deref(),
            region: fields.region.as_deref(),
            city: fields.city.as_deref(),
            assigned_to: fields.assigned_to.map(|id| id.get()),
            updated_at,
        }
    }
}

impl<'a> From<&'a DomainNewLead> for NewLead<'a> {
    fn from(lead: &'a DomainNewLead) -> Self {
        let attributes = &lead.attributes;
        Self {
            team_id: lead.team_id.get(),
            name: lead.name.as_str(),
            company_name: attributes.company_name.as_deref(),
            email: attributes.email.as_ref().map(EmailAddress::as_str),
            phone: attributes.phone.as_ref().map(PhoneNumber::as_str),
            website: attributes.website.as_ref().map(|w| w.as_str()),
            source: attributes.source.as_deref(),
            industry: attributes.industry.as_deref(),
            country: attributes.country.as_deref(),
            region: attributes.region.as_deref(),
            city: attributes.city.as_deref(),
            status: LeadStatus::New.as_str(),
        }
    }
}
