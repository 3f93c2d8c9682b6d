use std::collections::HashMap;

use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        company::{CompanyField, MergeSource, NewCompany},
        types::{CompanyDomain, CompanyId, CompanyName, EmailAddress, MemberId, PhoneNumber, TeamId},
    },
    forms::{FormError, optional_text, parse_label},
};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddCompanyForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i32>,
}

pub struct AddCompanyPayload {
    pub name: CompanyName,
    pub domain: Option<CompanyDomain>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<MemberId>,
}

impl TryFrom<AddCompanyForm> for AddCompanyPayload {
    type Error = FormError;

    fn try_from(form: AddCompanyForm) -> Result<Self, Self::Error> {
        form.validate()?;

        Ok(Self {
            name: CompanyName::new(form.name).map_err(|_| FormError::InvalidName)?,
            domain: optional_text(form.domain)
                .map(|domain| CompanyDomain::new(domain).map_err(|_| FormError::InvalidUrl))
                .transpose()?,
            email: optional_text(form.email)
                .map(|email| EmailAddress::new(email).map_err(|_| FormError::InvalidEmail))
                .transpose()?,
            phone: optional_text(form.phone)
                .map(|phone| PhoneNumber::new(phone).map_err(|_| FormError::InvalidPhoneNumber))
                .transpose()?,
            industry: optional_text(form.industry),
            country: optional_text(form.country),
            owner_id: form
                .owner_id
                .map(|id| MemberId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
        })
    }
}

impl AddCompanyPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewCompany {
        NewCompany {
            team_id,
            name: self.name,
            domain: self.domain,
            email: self.email,
            phone: self.phone,
            industry: self.industry,
            country: self.country,
            owner_id: self.owner_id,
        }
    }
}

/// Merge request: `fields` maps a company column to the record it is taken
/// from (`primary` or `duplicate`).
#[derive(Debug, Deserialize)]
pub struct MergeCompaniesForm {
    pub primary_id: i32,
    pub duplicate_id: i32,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

pub struct MergeCompaniesPayload {
    pub primary_id: CompanyId,
    pub duplicate_id: CompanyId,
    pub selection: HashMap<CompanyField, MergeSource>,
}

impl TryFrom<MergeCompaniesForm> for MergeCompaniesPayload {
    type Error = FormError;

    fn try_from(form: MergeCompaniesForm) -> Result<Self, Self::Error> {
        let selection = form
            .fields
            .iter()
            .map(|(field, source)| {
                Ok((
                    parse_label::<CompanyField>("field", field)?,
                    parse_label::<MergeSource>("source", source)?,
                ))
            })
            .collect::<Result<HashMap<_, _>, FormError>>()?;

        Ok(Self {
            primary_id: CompanyId::new(form.primary_id).map_err(|_| FormError::InvalidId)?,
            duplicate_id: CompanyId::new(form.duplicate_id).map_err(|_| FormError::InvalidId)?,
            selection,
        })
    }
}
