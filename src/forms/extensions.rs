use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    domain::{
        extension::{HookEvent, NewExtension},
        types::{ExtensionName, HandlerKey, TeamId},
    },
    forms::{FormError, parse_label},
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddExtensionForm {
    #[validate(length(min = 1))]
    pub name: String,
    pub event: String,
    #[validate(length(min = 1))]
    pub handler: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub priority: i32,
}

pub struct AddExtensionPayload {
    pub name: ExtensionName,
    pub event: HookEvent,
    pub handler: HandlerKey,
    pub config: Value,
    pub priority: i32,
}

impl TryFrom<AddExtensionForm> for AddExtensionPayload {
    type Error = FormError;

    fn try_from(form: AddExtensionForm) -> Result<Self, Self::Error> {
        form.validate()?;

        Ok(Self {
            name: ExtensionName::new(form.name).map_err(|_| FormError::InvalidName)?,
            event: parse_label("event", &form.event)?,
            handler: HandlerKey::new(form.handler).map_err(|_| FormError::InvalidName)?,
            config: form.config,
            priority: form.priority,
        })
    }
}

impl AddExtensionPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewExtension {
        NewExtension {
            team_id,
            name: self.name,
            event: self.event,
            handler: self.handler,
            config: self.config,
            priority: self.priority,
        }
    }
}
