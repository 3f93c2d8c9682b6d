use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::extension::{
    Extension as DomainExtension, HookEvent, NewExtension as DomainNewExtension,
};
use crate::domain::types::{ExtensionId, ExtensionName, HandlerKey, TeamId, TypeConstraintError};
use crate::models::{from_json, to_json};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::extensions)]
/// Diesel model for [`crate::domain::extension::Extension`].
pub struct Extension {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub event: String,
    pub handler: String,
    pub config: String,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::extensions)]
/// Insertable form of [`Extension`].
pub struct NewExtension<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub event: &'a str,
    pub handler: &'a str,
    pub config: String,
    pub priority: i32,
}

impl TryFrom<Extension> for DomainExtension {
    type Error = TypeConstraintError;

    fn try_from(extension: Extension) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ExtensionId::try_from(extension.id)?,
            team_id: TeamId::try_from(extension.team_id)?,
            name: ExtensionName::new(extension.name)?,
            event: HookEvent::try_from(extension.event)?,
            handler: HandlerKey::new(extension.handler)?,
            config: from_json(&extension.config)?,
            priority: extension.priority,
            is_active: extension.is_active,
            created_at: extension.created_at,
        })
    }
}

impl<'a> TryFrom<&'a DomainNewExtension> for NewExtension<'a> {
    type Error = TypeConstraintError;

    fn try_from(extension: &'a DomainNewExtension) -> Result<Self, Self::Error> {
        Ok(Self {
            team_id: extension.team_id.get(),
            name: extension.name.as_str(),
            event: extension.event.as_str(),
            handler: extension.handler.as_str(),
            config: to_json(&extension.config)?,
            priority: extension.priority,
        })
    }
}
