//! Diesel row models and their conversions to domain types.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::types::TypeConstraintError;

pub mod company;
pub mod config;
pub mod extension;
pub mod lead;
pub mod member;
pub mod opportunity;
pub mod process;
pub mod support_case;
pub mod territory;

/// Decodes a JSON `TEXT` column.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, TypeConstraintError> {
    serde_json::from_str(raw).map_err(|e| TypeConstraintError::InvalidValue(e.to_string()))
}

/// Encodes a value for a JSON `TEXT` column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, TypeConstraintError> {
    serde_json::to_string(value).map_err(|e| TypeConstraintError::InvalidValue(e.to_string()))
}

/// Rebuilds an optional identifier from a nullable column.
pub(crate) fn optional_id<T>(value: Option<i32>) -> Result<Option<T>, TypeConstraintError>
where
    T: TryFrom<i32, Error = TypeConstraintError>,
{
    value.map(T::try_from).transpose()
}
