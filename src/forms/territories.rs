use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        territory::{NewTerritory, TerritoryRule},
        types::{MemberId, TeamId, TerritoryName},
    },
    forms::{FormError, parse_label},
};

#[derive(Debug, Deserialize)]
pub struct TerritoryRuleForm {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddTerritoryForm {
    #[validate(length(min = 1))]
    pub name: String,
    pub owner_id: i32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub rules: Vec<TerritoryRuleForm>,
}

pub struct AddTerritoryPayload {
    pub name: TerritoryName,
    pub owner_id: MemberId,
    pub priority: i32,
    pub rules: Vec<TerritoryRule>,
}

impl TryFrom<AddTerritoryForm> for AddTerritoryPayload {
    type Error = FormError;

    fn try_from(form: AddTerritoryForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let rules = form
            .rules
            .into_iter()
            .filter(|rule| !rule.value.trim().is_empty())
            .map(|rule| {
                Ok(TerritoryRule::new(
                    parse_label("field", &rule.field)?,
                    rule.value.trim(),
                ))
            })
            .collect::<Result<Vec<_>, FormError>>()?;

        Ok(Self {
            name: TerritoryName::new(form.name).map_err(|_| FormError::InvalidName)?,
            owner_id: MemberId::new(form.owner_id).map_err(|_| FormError::InvalidId)?,
            priority: form.priority,
            rules,
        })
    }
}

impl AddTerritoryPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewTerritory {
        NewTerritory {
            team_id,
            name: self.name,
            owner_id: self.owner_id,
            priority: self.priority,
            rules: self.rules,
        }
    }
}
