use diesel::prelude::*;

use crate::{
    domain::{
        extension::{Extension, HookEvent, NewExtension},
        types::{ExtensionId, TeamId},
    },
    models::extension::{Extension as DbExtension, NewExtension as DbNewExtension},
    repository::{
        DieselRepository, ExtensionReader, ExtensionWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_domain(rows: Vec<DbExtension>) -> RepositoryResult<Vec<Extension>> {
    rows.into_iter()
        .map(|row| Extension::try_from(row).map_err(RepositoryError::from))
        .collect()
}

impl ExtensionReader for DieselRepository {
    fn list_extensions(&self, team_id: TeamId) -> RepositoryResult<Vec<Extension>> {
        use crate::schema::extensions;

        let mut conn = self.conn()?;
        let rows = extensions::table
            .filter(extensions::team_id.eq(team_id.get()))
            .order((extensions::event.asc(), extensions::priority.asc(), extensions::id.asc()))
            .load::<DbExtension>(&mut conn)?;

        into_domain(rows)
    }

    fn list_active_extensions(
        &self,
        team_id: TeamId,
        event: HookEvent,
    ) -> RepositoryResult<Vec<Extension>> {
        use crate::schema::extensions;

        let mut conn = self.conn()?;
        let rows = extensions::table
            .filter(extensions::team_id.eq(team_id.get()))
            .filter(extensions::event.eq(event.as_str()))
            .filter(extensions::is_active.eq(true))
            .order((extensions::priority.asc(), extensions::id.asc()))
            .load::<DbExtension>(&mut conn)?;

        into_domain(rows)
    }
}

impl ExtensionWriter for DieselRepository {
    fn create_extension(&self, new_extension: &NewExtension) -> RepositoryResult<Extension> {
        use crate::schema::extensions;

        let mut conn = self.conn()?;
        let db_new_extension = DbNewExtension::try_from(new_extension)?;

        let db_extension = diesel::insert_into(extensions::table)
            .values(&db_new_extension)
            .get_result::<DbExtension>(&mut conn)?;

        Ok(Extension::try_from(db_extension)?)
    }

    fn set_extension_active(
        &self,
        id: ExtensionId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Extension> {
        use crate::schema::extensions;

        let mut conn = self.conn()?;
        let db_extension = diesel::update(
            extensions::table
                .filter(extensions::id.eq(id.get()))
                .filter(extensions::team_id.eq(team_id.get())),
        )
        .set(extensions::is_active.eq(is_active))
        .get_result::<DbExtension>(&mut conn)?;

        Ok(Extension::try_from(db_extension)?)
    }
}
