use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::{
        opportunity::{NewOpportunity, OpportunityStage},
        types::{CompanyId, MemberId, OpportunityName, TeamId},
    },
    forms::{FormError, parse_label},
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddOpportunityForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub company_id: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub amount_cents: i64,
    #[serde(default)]
    pub owner_id: Option<i32>,
}

pub struct AddOpportunityPayload {
    pub name: OpportunityName,
    pub company_id: Option<CompanyId>,
    pub amount_cents: i64,
    pub owner_id: Option<MemberId>,
}

impl TryFrom<AddOpportunityForm> for AddOpportunityPayload {
    type Error = FormError;

    fn try_from(form: AddOpportunityForm) -> Result<Self, Self::Error> {
        form.validate()?;

        Ok(Self {
            name: OpportunityName::new(form.name).map_err(|_| FormError::InvalidName)?,
            company_id: form
                .company_id
                .map(|id| CompanyId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
            amount_cents: form.amount_cents,
            owner_id: form
                .owner_id
                .map(|id| MemberId::new(id).map_err(|_| FormError::InvalidId))
                .transpose()?,
        })
    }
}

impl AddOpportunityPayload {
    pub fn into_domain(self, team_id: TeamId) -> NewOpportunity {
        NewOpportunity {
            team_id,
            company_id: self.company_id,
            name: self.name,
            amount_cents: self.amount_cents,
            owner_id: self.owner_id,
        }
    }
}

/// Query string of the opportunity listing.
#[derive(Debug, Default, Deserialize)]
pub struct OpportunityListForm {
    pub company_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStageForm {
    pub stage: String,
}

impl TryFrom<ChangeStageForm> for OpportunityStage {
    type Error = FormError;

    fn try_from(form: ChangeStageForm) -> Result<Self, Self::Error> {
        parse_label("stage", &form.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_is_rejected() {
        let form = AddOpportunityForm {
            name: "Renewal".to_string(),
            company_id: None,
            amount_cents: -5,
            owner_id: None,
        };

        assert!(matches!(
            AddOpportunityPayload::try_from(form),
            Err(FormError::Validation(_))
        ));
    }

    #[test]
    fn stage_labels_parse() {
        let stage = OpportunityStage::try_from(ChangeStageForm {
            stage: "closed_won".to_string(),
        })
        .unwrap();
        assert_eq!(stage, OpportunityStage::ClosedWon);
    }
}
