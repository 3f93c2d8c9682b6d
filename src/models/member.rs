//! Diesel models representing team members and the round-robin cursor.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::member::{Member as DomainMember, NewMember as DomainNewMember};
use crate::domain::types::{EmailAddress, MemberId, MemberName, TeamId, TypeConstraintError};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::members)]
/// Diesel model for [`crate::domain::member::Member`].
pub struct Member {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::members)]
/// Insertable form of [`Member`].
pub struct NewMember<'a> {
    pub team_id: i32,
    pub name: &'a str,
    pub email: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::assignment_cursors)]
/// Last member that received a round-robin lead in a team.
pub struct AssignmentCursor {
    pub team_id: i32,
    pub last_member_id: i32,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<Member> for DomainMember {
    type Error = TypeConstraintError;

    fn try_from(member: Member) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MemberId::try_from(member.id)?,
            team_id: TeamId::try_from(member.team_id)?,
            name: MemberName::new(member.name)?,
            email: EmailAddress::new(member.email)?,
            is_active: member.is_active,
            created_at: member.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewMember> for NewMember<'a> {
    fn from(member: &'a DomainNewMember) -> Self {
        Self {
            team_id: member.team_id.get(),
            name: member.name.as_str(),
            email: member.email.as_str(),
            is_active: member.is_active,
        }
    }
}
