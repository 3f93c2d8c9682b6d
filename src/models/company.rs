use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::company::{
    Company as DomainCompany, MergedCompanyFields, NewCompany as DomainNewCompany,
};
use crate::domain::types::{
    CompanyDomain, CompanyId, CompanyName, EmailAddress, PhoneNumber, TeamId,
    TypeConstraintError,
};
use crate::models::optional_id;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::companies)]
/// Diesel model for [`crate::domain::company::Company`].
pub struct Company {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub domain: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<i32>,
    pub merged_into_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::companies)]
/// Insertable form of [`Company`].
pub struct NewCompany<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub domain: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub country: Option<&'a str>,
    pub owner_id: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::companies, treat_none_as_null = true)]
/// Column values written to the surviving account of a merge.
pub struct MergedCompany<'a> {
    pub name: &'a str,
    pub domain: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub country: Option<&'a str>,
    pub owner_id: Option<i32>,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<Company> for DomainCompany {
    type Error = TypeConstraintError;

    fn try_from(company: Company) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CompanyId::try_from(company.id)?,
            team_id: TeamId::try_from(company.team_id)?,
            name: CompanyName::new(company.name)?,
            domain: company.domain.map(CompanyDomain::new).transpose()?,
            email: company.email.map(EmailAddress::new).transpose()?,
            phone: company.phone.map(PhoneNumber::from_stored),
            industry: company.industry,
            country: company.country,
            owner_id: optional_id(company.owner_id)?,
            merged_into_id: optional_id(company.merged_into_id)?,
            created_at: company.created_at,
            updated_at: company.updated_at,
            deleted_at: company.deleted_at,
        })
    }
}

impl<'a> From<&'a DomainNewCompany> for NewCompany<'a> {
    fn from(company: &'a DomainNewCompany) -> Self {
        Self {
            team_id: company.team_id.get(),
            name: company.name.as_str(),
            domain: company.domain.as_ref().map(CompanyDomain::as_str),
            email: company.email.as_ref().map(EmailAddress::as_str),
            phone: company.phone.as_ref().map(PhoneNumber::as_str),
            industry: company.industry.as_deref(),
            country: company.country.as_deref(),
            owner_id: company.owner_id.map(|id| id.get()),
        }
    }
}

impl<'a> MergedCompany<'a> {
    pub fn new(fields: &'a MergedCompanyFields, updated_at: NaiveDateTime) -> Self {
        Self {
            name: fields.name.as_str(),
            domain: fields.domain.as_ref().map(CompanyDomain::as_str),
            email: fields.email.as_ref().map(EmailAddress::as_str),
            phone: fields.phone.as_ref().map(PhoneNumber::as_str),
            industry: fields.industry.as_deref(),
            country: fields.country.as_deref(),
            owner_id: fields.owner_id.map(|id| id.get()),
            updated_at,
        }
    }
}
