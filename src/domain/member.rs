//! Team members: the people leads, cases and territories are assigned to.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::auth::AuthenticatedUser;
use crate::domain::types::{
    EmailAddress, MemberId, MemberName, TeamId, TypeConstraintError,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub team_id: TeamId,
    pub name: MemberName,
    pub email: EmailAddress,
    /// Inactive members keep their history but receive no new work.
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMember {
    pub team_id: TeamId,
    pub name: MemberName,
    pub email: EmailAddress,
    pub is_active: bool,
}

impl NewMember {
    #[must_use]
    pub fn new(team_id: TeamId, name: MemberName, email: EmailAddress) -> Self {
        Self {
            team_id,
            name,
            email,
            is_active: true,
        }
    }

    /// Validates raw values before building the payload.
    pub fn try_new(
        team_id: i32,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, TypeConstraintError> {
        Ok(Self::new(
            TeamId::new(team_id)?,
            MemberName::new(name)?,
            EmailAddress::new(email)?,
        ))
    }
}

impl TryFrom<&AuthenticatedUser> for NewMember {
    type Error = TypeConstraintError;

    fn try_from(user: &AuthenticatedUser) -> Result<Self, Self::Error> {
        Self::try_new(user.hub_id, user.name.as_str(), user.email.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_member_from_authenticated_user() {
        let user = AuthenticatedUser {
            sub: "7".to_string(),
            email: "Rep@Example.com".to_string(),
            hub_id: 3,
            name: "Rep".to_string(),
            roles: vec!["crm".to_string()],
            exp: 0,
        };

        let member = NewMember::try_from(&user).expect("valid member");

        assert_eq!(member.team_id.get(), 3);
        assert_eq!(member.email.as_str(), "rep@example.com");
        assert!(member.is_active);
    }

    #[test]
    fn new_member_rejects_invalid_team() {
        assert!(NewMember::try_new(0, "Rep", "rep@example.com").is_err());
    }
}
