//! Request payloads accepted by the JSON API and their validation.

use serde::Deserialize;
use thiserror::Error;
use validator::ValidationErrors;

pub mod companies;
pub mod extensions;
pub mod leads;
pub mod members;
pub mod opportunities;
pub mod processes;
pub mod support_cases;
pub mod territories;

#[derive(Debug, Error)]
/// Errors that can occur when processing form data.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid identifier")]
    InvalidId,

    #[error("invalid name")]
    InvalidName,

    #[error("invalid phone number")]
    InvalidPhoneNumber,

    #[error("invalid url")]
    InvalidUrl,

    #[error("invalid text")]
    InvalidNotes,

    #[error("invalid {field}: {value}")]
    InvalidLabel { field: &'static str, value: String },

    #[error("invalid csv: {0}")]
    Csv(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Body of the activate/deactivate endpoints.
#[derive(Debug, Deserialize)]
pub struct ToggleActiveForm {
    pub is_active: bool,
}

/// Parses an optional free-text field, treating blank input as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses a label enum value, naming the offending field on failure.
pub(crate) fn parse_label<T>(field: &'static str, value: &str) -> Result<T, FormError>
where
    T: for<'a> TryFrom<&'a str>,
{
    T::try_from(value).map_err(|_| FormError::InvalidLabel {
        field,
        value: value.to_string(),
    })
}
