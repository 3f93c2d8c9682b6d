use diesel::prelude::*;

use crate::{
    domain::{
        territory::{NewTerritory, Territory},
        types::{TeamId, TerritoryId},
    },
    models::territory::{NewTerritory as DbNewTerritory, Territory as DbTerritory},
    repository::{
        DieselRepository, TerritoryReader, TerritoryWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl TerritoryReader for DieselRepository {
    fn get_territory_by_id(
        &self,
        id: TerritoryId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<Territory>> {
        use crate::schema::territories;

        let mut conn = self.conn()?;
        let db_territory = territories::table
            .filter(territories::id.eq(id.get()))
            .filter(territories::team_id.eq(team_id.get()))
            .first::<DbTerritory>(&mut conn)
            .optional()?;

        match db_territory {
            Some(db_territory) => Ok(Some(Territory::try_from(db_territory)?)),
            None => Ok(None),
        }
    }

    fn list_territories(&self, team_id: TeamId) -> RepositoryResult<Vec<Territory>> {
        use crate::schema::territories;

        let mut conn = self.conn()?;
        territories::table
            .filter(territories::team_id.eq(team_id.get()))
            .order((territories::priority.asc(), territories::id.asc()))
            .load::<DbTerritory>(&mut conn)?
            .into_iter()
            .map(|row| Territory::try_from(row).map_err(RepositoryError::from))
            .collect()
    }
}

impl TerritoryWriter for DieselRepository {
    fn create_territory(&self, new_territory: &NewTerritory) -> RepositoryResult<Territory> {
        use crate::schema::territories;

        let mut conn = self.conn()?;
        let db_new_territory = DbNewTerritory::try_from(new_territory)?;

        let db_territory = diesel::insert_into(territories::table)
            .values(&db_new_territory)
            .get_result::<DbTerritory>(&mut conn)?;

        Ok(Territory::try_from(db_territory)?)
    }

    fn set_territory_active(
        &self,
        id: TerritoryId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Territory> {
        use crate::schema::territories;

        let mut conn = self.conn()?;
        let db_territory = diesel::update(
            territories::table
                .filter(territories::id.eq(id.get()))
                .filter(territories::team_id.eq(team_id.get())),
        )
        .set(territories::is_active.eq(is_active))
        .get_result::<DbTerritory>(&mut conn)?;

        Ok(Territory::try_from(db_territory)?)
    }
}
