//! Leads and the rules governing their assignment and conversion.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::HashMap;

use crate::domain::company::{MergeRejection, MergeSource};
use crate::domain::duplicates::{MatchProfile, Matchable};
use crate::domain::types::{
    CompanyId, CompanyName, EmailAddress, LeadId, LeadName, MemberId, OpportunityId,
    OpportunityName, PhoneNumber, TeamId, WebsiteUrl, label_enum,
};

label_enum!(LeadStatus, "Lifecycle status of a lead.", {
    New => "new",
    Contacted => "contacted",
    Qualified => "qualified",
    Unqualified => "unqualified",
    Converted => "converted",
    Lost => "lost",
});

impl LeadStatus {
    /// Open leads count towards a member's workload.
    pub const OPEN: &'static [LeadStatus] =
        &[LeadStatus::New, LeadStatus::Contacted, LeadStatus::Qualified];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }
}

label_enum!(LeadField, "Lead attribute that territory rules can match on.", {
    Country => "country",
    Region => "region",
    City => "city",
    Industry => "industry",
    Source => "source",
});

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: LeadId,
    pub team_id: TeamId,
    pub name: LeadName,
    pub company_name: Option<String>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub status: LeadStatus,
    pub assigned_to: Option<MemberId>,
    pub converted_at: Option<NaiveDateTime>,
    pub converted_company_id: Option<CompanyId>,
    pub converted_opportunity_id: Option<OpportunityId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
    /// Set when this lead was folded into another one.
    pub merged_into_id: Option<LeadId>,
}

/// Reasons a lead cannot take part in an operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeadStateError {
    #[error("lead has already been converted")]
    AlreadyConverted,
    #[error("lead has been deleted")]
    Deleted,
}

impl Lead {
    /// Value of the attribute a territory rule refers to.
    pub fn attribute(&self, field: LeadField) -> Option<&str> {
        match field {
            LeadField::Country => self.country.as_deref(),
            LeadField::Region => self.region.as_deref(),
            LeadField::City => self.city.as_deref(),
            LeadField::Industry => self.industry.as_deref(),
            LeadField::Source => self.source.as_deref(),
        }
    }

    pub fn is_converted(&self) -> bool {
        self.status == LeadStatus::Converted || self.converted_at.is_some()
    }

    /// Fails for leads that can no longer be worked on.
    pub fn ensure_workable(&self) -> Result<(), LeadStateError> {
        if self.deleted_at.is_some() {
            return Err(LeadStateError::Deleted);
        }
        if self.is_converted() {
            return Err(LeadStateError::AlreadyConverted);
        }
        Ok(())
    }
}

impl Matchable for Lead {
    fn match_profile(&self) -> MatchProfile {
        let domain = self
            .website
            .as_deref()
            .or_else(|| self.email.as_ref().map(EmailAddress::domain));
        MatchProfile::new(
            self.company_name.as_deref().unwrap_or(self.name.as_str()),
            domain,
            self.phone.as_ref().map(PhoneNumber::as_str),
        )
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LeadAttributes {
    pub company_name: Option<String>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub website: Option<WebsiteUrl>,
    pub source: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewLead {
    pub team_id: TeamId,
    pub name: LeadName,
    pub attributes: LeadAttributes,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl NewLead {
    #[must_use]
    pub fn new(team_id: TeamId, name: LeadName, attributes: LeadAttributes) -> Self {
        Self {
            team_id,
            name,
            attributes: LeadAttributes {
                company_name: clean(attributes.company_name),
                source: clean(attributes.source),
                industry: clean(attributes.industry),
                country: clean(attributes.country),
                region: clean(attributes.region),
                city: clean(attributes.city),
                ..attributes
            },
        }
    }
}

/// Where the converted lead's company comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ConversionTarget {
    /// Attach the lead to an account that already exists.
    ExistingCompany(CompanyId),
    /// Create a new account named after the lead.
    NewCompany(CompanyName),
}

/// Everything needed to convert a lead in a single transaction.
#[derive(Clone, Debug)]
pub struct LeadConversion {
    pub lead_id: LeadId,
    pub team_id: TeamId,
    pub target: ConversionTarget,
    /// Opportunity to open at `prospecting`, if any.
    pub opportunity: Option<(OpportunityName, i64)>,
    pub owner_id: Option<MemberId>,
    pub converted_at: NaiveDateTime,
}

/// Records produced by a successful conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConvertedLead {
    pub lead: Lead,
    pub company_id: CompanyId,
    pub opportunity_id: Option<OpportunityId>,
}

label_enum!(LeadMergeField, "Lead column that a merge can take from either record.", {
    Name => "name",
    CompanyName => "company_name",
    Email => "email",
    Phone => "phone",
    Website => "website",
    Source => "source",
    Industry => "industry",
    Country => "country",
    Region => "region",
    City => "city",
    Owner => "owner",
});

/// Field values for the surviving lead after a merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedLeadFields {
    pub name: LeadName,
    pub company_name: Option<String>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub assigned_to: Option<MemberId>,
}

impl MergedLeadFields {
    /// Same rules as a company merge: the primary wins unless `selection`
    /// names the duplicate, and gaps are filled from the other record.
    pub fn resolve(
        primary: &Lead,
        duplicate: &Lead,
        selection: &HashMap<LeadMergeField, MergeSource>,
    ) -> Self {
        let pick = |field: LeadMergeField| {
            selection
                .get(&field)
                .copied()
                .unwrap_or(MergeSource::Primary)
        };

        Self {
            name: match pick(LeadMergeField::Name) {
                MergeSource::Primary => primary.name.clone(),
                MergeSource::Duplicate => duplicate.name.clone(),
            },
            company_name: pick(LeadMergeField::CompanyName)
                .choose(&primary.company_name, &duplicate.company_name),
            email: pick(LeadMergeField::Email).choose(&primary.email, &duplicate.email),
            phone: pick(LeadMergeField::Phone).choose(&primary.phone, &duplicate.phone),
            website: pick(LeadMergeField::Website).choose(&primary.website, &duplicate.website),
            source: pick(LeadMergeField::Source).choose(&primary.source, &duplicate.source),
            industry: pick(LeadMergeField::Industry).choose(&primary.industry, &duplicate.industry),
            country: pick(LeadMergeField::Country).choose(&primary.country, &duplicate.country),
            region: pick(LeadMergeField::Region).choose(&primary.region, &duplicate.region),
            city: pick(LeadMergeField::City).choose(&primary.city, &duplicate.city),
            assigned_to: pick(LeadMergeField::Owner)
                .choose(&primary.assigned_to, &duplicate.assigned_to),
        }
    }
}

/// A validated lead merge ready to be applied in one transaction.
#[derive(Clone, Debug)]
pub struct LeadMerge {
    pub team_id: TeamId,
    pub primary_id: LeadId,
    pub duplicate_id: LeadId,
    pub fields: MergedLeadFields,
    pub merged_at: NaiveDateTime,
}

/// Guards of a lead merge. Converted leads already live on as a company and
/// cannot take part.
pub fn check_lead_merge(
    primary_id: LeadId,
    duplicate_id: LeadId,
    primary: Option<&Lead>,
    duplicate: Option<&Lead>,
) -> Result<(), MergeRejection> {
    if primary_id == duplicate_id {
        return Err(MergeRejection::SameRecord);
    }
    let primary = primary.ok_or(MergeRejection::PrimaryNotFound)?;
    let duplicate = duplicate.ok_or(MergeRejection::DuplicateNotFound)?;
    if primary.deleted_at.is_some() {
        return Err(MergeRejection::PrimaryDeleted);
    }
    if duplicate.deleted_at.is_some() {
        return Err(MergeRejection::DuplicateDeleted);
    }
    if primary.is_converted() {
        return Err(MergeRejection::PrimaryConverted);
    }
    if duplicate.is_converted() {
        return Err(MergeRejection::DuplicateConverted);
    }
    Ok(())
}
