//! Repository implementation for team members.

use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        member::{Member, NewMember},
        types::{MemberId, TeamId},
    },
    models::member::{Member as DbMember, NewMember as DbNewMember},
    repository::{
        DieselRepository, MemberReader, MemberWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_domain(rows: Vec<DbMember>) -> RepositoryResult<Vec<Member>> {
    rows.into_iter()
        .map(|row| Member::try_from(row).map_err(RepositoryError::from))
        .collect()
}

impl MemberWriter for DieselRepository {
    fn create_or_update_member(&self, new_member: &NewMember) -> RepositoryResult<Member> {
        use crate::schema::members;

        let mut conn = self.conn()?;

        let db_new_member: DbNewMember = new_member.into();

        let db_member = diesel::insert_into(members::table)
            .values(&db_new_member)
            .on_conflict((members::email, members::team_id))
            .do_update()
            .set(members::name.eq(excluded(members::name)))
            .get_result::<DbMember>(&mut conn)?;

        Ok(Member::try_from(db_member)?)
    }

    fn set_member_active(
        &self,
        id: MemberId,
        team_id: TeamId,
        is_active: bool,
    ) -> RepositoryResult<Member> {
        use crate::schema::members;

        let mut conn = self.conn()?;

        let db_member = diesel::update(
            members::table
                .filter(members::id.eq(id.get()))
                .filter(members::team_id.eq(team_id.get())),
        )
        .set(members::is_active.eq(is_active))
        .get_result::<DbMember>(&mut conn)?;

        Ok(Member::try_from(db_member)?)
    }
}

impl MemberReader for DieselRepository {
    fn get_member_by_id(&self, id: MemberId, team_id: TeamId) -> RepositoryResult<Option<Member>> {
        use crate::schema::members;

        let mut conn = self.conn()?;
        let db_member = members::table
            .filter(members::id.eq(id.get()))
            .filter(members::team_id.eq(team_id.get()))
            .first::<DbMember>(&mut conn)
            .optional()?;

        match db_member {
            Some(db_member) => Ok(Some(Member::try_from(db_member)?)),
            None => Ok(None),
        }
    }

    fn list_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>> {
        use crate::schema::members;

        let mut conn = self.conn()?;
        let rows = members::table
            .filter(members::team_id.eq(team_id.get()))
            .order(members::id.asc())
            .load::<DbMember>(&mut conn)?;

        into_domain(rows)
    }

    fn list_active_members(&self, team_id: TeamId) -> RepositoryResult<Vec<Member>> {
        use crate::schema::members;

        let mut conn = self.conn()?;
        let rows = members::table
            .filter(members::team_id.eq(team_id.get()))
            .filter(members::is_active.eq(true))
            .order(members::id.asc())
            .load::<DbMember>(&mut conn)?;

        into_domain(rows)
    }
}
