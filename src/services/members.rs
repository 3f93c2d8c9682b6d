//! Services managing team members.

use crate::domain::auth::AuthenticatedUser;
use crate::domain::member::{Member, NewMember};
use crate::domain::types::{MemberId, TeamId};
use crate::forms::members::{AddMemberForm, AddMemberPayload};
use crate::repository::{MemberReader, MemberWriter};
use crate::services::{ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Upserts the caller as a member of their team and returns the record.
pub fn current_member<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Member>
where
    R: MemberWriter + ?Sized,
{
    let new_member = NewMember::try_from(user)?;

    let member = repo.create_or_update_member(&new_member).map_err(|err| {
        log::error!("Failed to upsert member {}: {err}", user.email);
        err
    })?;

    Ok(member)
}

pub fn list_members<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Member>>
where
    R: MemberReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_members(team_id)?)
}

/// Validates the form and creates the member, or renames an existing one
/// with the same email.
pub fn add_member<R>(repo: &R, user: &AuthenticatedUser, form: AddMemberForm) -> ServiceResult<Member>
where
    R: MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = AddMemberPayload::try_from(form)?;

    let team_id = TeamId::new(user.hub_id)?;

    let member = repo
        .create_or_update_member(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to save member: {err}");
            err
        })?;

    log::info!("Member {} saved in team {}", member.id, team_id);

    Ok(member)
}

/// Deactivated members keep their history but receive no new work.
pub fn set_member_active<R>(
    repo: &R,
    user: &AuthenticatedUser,
    member_id: i32,
    is_active: bool,
) -> ServiceResult<Member>
where
    R: MemberReader + MemberWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let member_id = MemberId::new(member_id)?;

    Ok(repo.set_member_active(member_id, team_id, is_active)?)
}
