use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        member::NewMember,
        types::{EmailAddress, MemberName, TeamId},
    },
    forms::FormError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

pub struct AddMemberPayload {
    pub name: MemberName,
    pub email: EmailAddress,
}

impl TryFrom<AddMemberForm> for AddMemberPayload {
    type Error = FormError;

    fn try_from(form: AddMemberForm) -> Result<Self, Self::Error> {
        form.validate()?;

        Ok(Self {
            name: MemberName::new(form.name).map_err(|_| FormError::InvalidName)?,
            email: EmailAddress::new(form.email).map_err(|_| FormError::InvalidEmail)?,
        })
    }
}

impl AddMemberPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewMember {
        NewMember::new(team_id, self.name, self.email)
    }
}
