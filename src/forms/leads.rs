//! Lead intake, listing filters, merge and conversion requests.

use std::collections::HashMap;

use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        assignment::AssignmentStrategy,
        company::MergeSource,
        lead::{LeadAttributes, LeadMergeField, LeadStatus, NewLead},
        types::{
            CompanyId, CompanyName, EmailAddress, LeadId, LeadName, MemberId, OpportunityName,
            PhoneNumber, TeamId, WebsiteUrl,
        },
    },
    forms::{FormError, optional_text, parse_label},
};

/// A single lead as submitted through the API or one CSV row.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddLeadForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

pub struct AddLeadPayload {
    pub name: LeadName,
    pub attributes: LeadAttributes,
}

impl TryFrom<AddLeadForm> for AddLeadPayload {
    type Error = FormError;

    fn try_from(form: AddLeadForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let email = optional_text(form.email)
            .map(|email| EmailAddress::new(email).map_err(|_| FormError::InvalidEmail))
            .transpose()?;
        let phone = optional_text(form.phone)
            .map(|phone| PhoneNumber::new(phone).map_err(|_| FormError::InvalidPhoneNumber))
            .transpose()?;
        let website = optional_text(form.website)
            .map(|url| WebsiteUrl::new(url).map_err(|_| FormError::InvalidUrl))
            .transpose()?;

        Ok(Self {
            name: LeadName::new(form.name).map_err(|_| FormError::InvalidName)?,
            attributes: LeadAttributes {
                company_name: optional_text(form.company_name),
                email,
                phone,
                website,
                source: optional_text(form.source),
                industry: optional_text(form.industry),
                country: optional_text(form.country),
                region: optional_text(form.region),
                city: optional_text(form.city),
            },
        })
    }
}

impl AddLeadPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewLead {
        NewLead::new(team_id, self.name, self.attributes)
    }
}

/// Parses a CSV upload into validated lead payloads.
///
/// The header row is required and must contain `name`; header names are
/// matched case-insensitively, other known columns map to lead attributes and
/// unknown columns are ignored. The first invalid row fails the whole upload.
pub fn parse_leads_csv(data: &[u8]) -> Result<Vec<AddLeadPayload>, FormError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| FormError::Csv(e.to_string()))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    if !headers.iter().any(|h| h == "name") {
        return Err(FormError::MissingField("name"));
    }
    reader.set_headers(headers);

    let mut payloads = Vec::new();
    for (index, row) in reader.deserialize::<AddLeadForm>().enumerate() {
        // Row 1 is the header.
        let line = index + 2;
        let form = row.map_err(|e| FormError::Csv(format!("line {line}: {e}")))?;
        let payload = AddLeadPayload::try_from(form)
            .map_err(|e| FormError::Csv(format!("line {line}: {e}")))?;
        payloads.push(payload);
    }

    Ok(payloads)
}

/// Merge request: `fields` maps a lead column to the record it is taken
/// from (`primary` or `duplicate`).
#[derive(Debug, Deserialize)]
pub struct MergeLeadsForm {
    pub primary_id: i32,
    pub duplicate_id: i32,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

pub struct MergeLeadsPayload {
    pub primary_id: LeadId,
    pub duplicate_id: LeadId,
    pub selection: HashMap<LeadMergeField, MergeSource>,
}

impl TryFrom<MergeLeadsForm> for MergeLeadsPayload {
    type Error = FormError;

    fn try_from(form: MergeLeadsForm) -> Result<Self, Self::Error> {
        let selection = form
            .fields
            .iter()
            .map(|(field, source)| {
                Ok((
                    parse_label::<LeadMergeField>("field", field)?,
                    parse_label::<MergeSource>("source", source)?,
                ))
            })
            .collect::<Result<HashMap<_, _>, FormError>>()?;

        Ok(Self {
            primary_id: LeadId::new(form.primary_id).map_err(|_| FormError::InvalidId)?,
            duplicate_id: LeadId::new(form.duplicate_id).map_err(|_| FormError::InvalidId)?,
            selection,
        })
    }
}

/// Query string of the lead listing.
#[derive(Debug, Default, Deserialize)]
pub struct LeadListForm {
    pub page: Option<usize>,
    pub status: Option<String>,
    pub assigned_to: Option<i32>,
}

pub struct LeadListPayload {
    pub page: usize,
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<MemberId>,
}

impl TryFrom<LeadListForm> for LeadListPayload {
    type Error = FormError;

    fn try_from(form: LeadListForm) -> Result<Self, Self::Error> {
        Ok(Self {
            page: form.page.unwrap_or(1).max(1),
            status: form
                .status
                .as_deref()
                .map(|s| parse_label("status", s))
                .transpose()?,
            assigned_to: form
                .assigned_to
                .map(|id| MemberId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignLeadForm {
    pub strategy: String,
}

impl TryFrom<AssignLeadForm> for AssignmentStrategy {
    type Error = FormError;

    fn try_from(form: AssignLeadForm) -> Result<Self, Self::Error> {
        parse_label("strategy", &form.strategy)
    }
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusForm {
    pub status: String,
}

impl TryFrom<LeadStatusForm> for LeadStatus {
    type Error = FormError;

    fn try_from(form: LeadStatusForm) -> Result<Self, Self::Error> {
        parse_label("status", &form.status)
    }
}

/// Conversion request. Without `company_id` a new company is created, named
/// `company_name` or, failing that, after the lead.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConvertLeadForm {
    #[serde(default)]
    pub company_id: Option<i32>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub opportunity_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub amount_cents: Option<i64>,
}

pub struct ConvertLeadPayload {
    pub company_id: Option<CompanyId>,
    pub company_name: Option<CompanyName>,
    pub opportunity: Option<(OpportunityName, i64)>,
}

impl TryFrom<ConvertLeadForm> for ConvertLeadPayload {
    type Error = FormError;

    fn try_from(form: ConvertLeadForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let opportunity = match optional_text(form.opportunity_name) {
            Some(name) => Some((
                OpportunityName::new(name).map_err(|_| FormError::InvalidName)?,
                form.amount_cents.unwrap_or(0),
            )),
            None if form.amount_cents.is_some() => {
                return Err(FormError::MissingField("opportunity_name"));
            }
            None => None,
        };

        Ok(Self {
            company_id: form
                .company_id
                .map(|id| CompanyId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
            company_name: optional_text(form.company_name)
                .map(|name| CompanyName::new(name).map_err(|_| FormError::InvalidName))
                .transpose()?,
            opportunity,
        })
    }
}
