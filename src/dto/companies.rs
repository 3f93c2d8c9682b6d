use serde::Serialize;

use crate::domain::company::Company;
use crate::domain::duplicates::DuplicateCandidate;
use crate::domain::lead::Lead;

/// Likely duplicates of a lead among both leads and companies.
#[derive(Debug, Serialize)]
pub struct LeadDuplicates {
    pub leads: Vec<DuplicateCandidate<Lead>>,
    pub companies: Vec<DuplicateCandidate<Company>>,
}
