//! Company accounts and the merge of duplicate accounts.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::duplicates::{MatchProfile, Matchable};
use crate::domain::types::{
    CompanyDomain, CompanyId, CompanyName, EmailAddress, MemberId, PhoneNumber, TeamId,
    label_enum,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: CompanyId,
    pub team_id: TeamId,
    pub name: CompanyName,
    pub domain: Option<CompanyDomain>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<MemberId>,
    /// Set when this account was folded into another one.
    pub merged_into_id: Option<CompanyId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Company {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Matchable for Company {
    fn match_profile(&self) -> MatchProfile {
        let domain = self
            .domain
            .as_ref()
            .map(CompanyDomain::as_str)
            .or_else(|| self.email.as_ref().map(EmailAddress::domain));
        MatchProfile::new(
            self.name.as_str(),
            domain,
            self.phone.as_ref().map(PhoneNumber::as_str),
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewCompany {
    pub team_id: TeamId,
    pub name: CompanyName,
    pub domain: Option<CompanyDomain>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<MemberId>,
}

impl NewCompany {
    #[must_use]
    pub fn named(team_id: TeamId, name: CompanyName) -> Self {
        Self {
            team_id,
            name,
            domain: None,
            email: None,
            phone: None,
            industry: None,
            country: None,
            owner_id: None,
        }
    }
}

label_enum!(CompanyField, "Company column that a merge can take from either record.", {
    Name => "name",
    Domain => "domain",
    Email => "email",
    Phone => "phone",
    Industry => "industry",
    Country => "country",
    Owner => "owner",
});

label_enum!(MergeSource, "Record a merged field value is taken from.", {
    Primary => "primary",
    Duplicate => "duplicate",
});

impl MergeSource {
    /// Value from the chosen record, falling back to the other one when the
    /// chosen record has none.
    pub fn choose<T: Clone>(self, primary: &Option<T>, duplicate: &Option<T>) -> Option<T> {
        match self {
            MergeSource::Duplicate => duplicate.clone().or_else(|| primary.clone()),
            MergeSource::Primary => primary.clone().or_else(|| duplicate.clone()),
        }
    }
}

/// Field values for the surviving account after a merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedCompanyFields {
    pub name: CompanyName,
    pub domain: Option<CompanyDomain>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<MemberId>,
}

impl MergedCompanyFields {
    /// Picks every field from the primary unless `selection` says otherwise.
    ///
    /// Empty primary values are filled from the duplicate so nothing known is
    /// lost when the caller leaves a field unselected.
    pub fn resolve(
        primary: &Company,
        duplicate: &Company,
        selection: &HashMap<CompanyField, MergeSource>,
    ) -> Self {
        let pick = |field: CompanyField| {
            selection
                .get(&field)
                .copied()
                .unwrap_or(MergeSource::Primary)
        };

        Self {
            name: match pick(CompanyField::Name) {
                MergeSource::Primary => primary.name.clone(),
                MergeSource::Duplicate => duplicate.name.clone(),
            },
            domain: pick(CompanyField::Domain).choose(&primary.domain, &duplicate.domain),
            email: pick(CompanyField::Email).choose(&primary.email, &duplicate.email),
            phone: pick(CompanyField::Phone).choose(&primary.phone, &duplicate.phone),
            industry: pick(CompanyField::Industry).choose(&primary.industry, &duplicate.industry),
            country: pick(CompanyField::Country).choose(&primary.country, &duplicate.country),
            owner_id: pick(CompanyField::Owner).choose(&primary.owner_id, &duplicate.owner_id),
        }
    }
}

/// A validated merge ready to be applied in one transaction.
#[derive(Clone, Debug)]
pub struct CompanyMerge {
    pub team_id: TeamId,
    pub primary_id: CompanyId,
    pub duplicate_id: CompanyId,
    pub fields: MergedCompanyFields,
    pub merged_at: NaiveDateTime,
}

/// What a merge moved over to the surviving account.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MergeSummary {
    pub company: Company,
    pub reattached_opportunities: usize,
    pub reattached_cases: usize,
    pub reattached_leads: usize,
}

/// Expected reasons a merge is refused.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeRejection {
    SameRecord,
    PrimaryNotFound,
    DuplicateNotFound,
    PrimaryDeleted,
    DuplicateDeleted,
    PrimaryConverted,
    DuplicateConverted,
}

impl MergeRejection {
    pub fn message(self) -> &'static str {
        match self {
            MergeRejection::SameRecord => "cannot merge a record into itself",
            MergeRejection::PrimaryNotFound => "primary record not found",
            MergeRejection::DuplicateNotFound => "duplicate record not found",
            MergeRejection::PrimaryDeleted => "primary record has been deleted",
            MergeRejection::DuplicateDeleted => "duplicate record has been deleted",
            MergeRejection::PrimaryConverted => "primary lead has already been converted",
            MergeRejection::DuplicateConverted => "duplicate lead has already been converted",
        }
    }
}

/// Result of a merge request: either applied or refused for a business reason.
///
/// `T` is what a successful merge reports; companies report a
/// [`MergeSummary`], leads the surviving lead.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome<T = MergeSummary> {
    Merged(T),
    Rejected { reason: MergeRejection, error: String },
}

impl<T> MergeOutcome<T> {
    pub fn rejected(reason: MergeRejection) -> Self {
        MergeOutcome::Rejected {
            reason,
            error: reason.message().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MergeOutcome::Merged(_))
    }
}

/// Checks the guards that make a merge pointless or unsafe.
pub fn check_merge(
    primary_id: CompanyId,
    duplicate_id: CompanyId,
    primary: Option<&Company>,
    duplicate: Option<&Company>,
) -> Result<(), MergeRejection> {
    if primary_id == duplicate_id {
        return Err(MergeRejection::SameRecord);
    }
    let primary = primary.ok_or(MergeRejection::PrimaryNotFound)?;
    let duplicate = duplicate.ok_or(MergeRejection::DuplicateNotFound)?;
    if primary.is_deleted() {
        return Err(MergeRejection::PrimaryDeleted);
    }
    if duplicate.is_deleted() {
        return Err(MergeRejection::DuplicateDeleted);
    }
    Ok(())
}
