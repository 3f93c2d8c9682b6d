use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::territory::{
    NewTerritory as DomainNewTerritory, Territory as DomainTerritory, TerritoryRule,
};
use crate::domain::types::{MemberId, TeamId, TerritoryId, TerritoryName, TypeConstraintError};
use crate::models::{from_json, to_json};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::territories)]
/// Diesel model for [`crate::domain::territory::Territory`]. `rules` holds JSON.
pub struct Territory {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub owner_id: i32,
    pub priority: i32,
    pub rules: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::territories)]
/// Insertable form of [`Territory`].
pub struct NewTerritory<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub owner_id: i32,
    pub priority: i32,
    pub rules: String,
}

impl TryFrom<Territory> for DomainTerritory {
    type Error = TypeConstraintError;

    fn try_from(territory: Territory) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TerritoryId::try_from(territory.id)?,
            team_id: TeamId::try_from(territory.team_id)?,
            name: TerritoryName::new(territory.name)?,
            owner_id: MemberId::try_from(territory.owner_id)?,
            priority: territory.priority,
            rules: from_json::<Vec<TerritoryRule>>(&territory.rules)?,
            is_active: territory.is_active,
            created_at: territory.created_at,
            updated_at: territory.updated_at,
        })
    }
}

impl<'a> TryFrom<&'a DomainNewTerritory> for NewTerritory<'a> {
    type Error = TypeConstraintError;

    fn try_from(territory: &'a DomainNewTerritory) -> Result<Self, Self::Error> {
        Ok(Self {
            team_id: territory.team_id.get(),
            name: territory.name.as_str(),
            owner_id: territory.owner_id.get(),
            priority: territory.priority,
            rules: to_json(&territory.rules)?,
        })
    }
}
