//! Opportunities and the stage transition table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::{
    CompanyId, MemberId, OpportunityId, OpportunityName, TeamId, label_enum,
};

label_enum!(OpportunityStage, "Sales pipeline stage.", {
    Prospecting => "prospecting",
    Qualification => "qualification",
    NeedsAnalysis => "needs_analysis",
    Proposal => "proposal",
    Negotiation => "negotiation",
    ClosedWon => "closed_won",
    ClosedLost => "closed_lost",
});

impl OpportunityStage {
    /// Win probability (percent) assigned when entering the stage.
    pub const fn default_probability(self) -> i32 {
        match self {
            OpportunityStage::Prospecting => 10,
            OpportunityStage::Qualification => 20,
            OpportunityStage::NeedsAnalysis => 40,
            OpportunityStage::Proposal => 60,
            OpportunityStage::Negotiation => 80,
            OpportunityStage::ClosedWon => 100,
            OpportunityStage::ClosedLost => 0,
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            OpportunityStage::ClosedWon | OpportunityStage::ClosedLost
        )
    }

    /// Open stages may move anywhere else; closed stages are terminal.
    pub fn can_transition_to(self, next: OpportunityStage) -> bool {
        self != next && !self.is_closed()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageTransitionError {
    #[error("opportunity is already at stage {0}")]
    Unchanged(OpportunityStage),
    #[error("opportunity is closed ({0}) and cannot move to {1}")]
    Closed(OpportunityStage, OpportunityStage),
    #[error("opportunity has been deleted")]
    Deleted,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub team_id: TeamId,
    pub company_id: Option<CompanyId>,
    pub name: OpportunityName,
    pub amount_cents: i64,
    pub stage: OpportunityStage,
    pub probability: i32,
    pub owner_id: Option<MemberId>,
    pub closed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Column values written when an opportunity changes stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageChange {
    pub from: OpportunityStage,
    pub stage: OpportunityStage,
    pub probability: i32,
    pub closed_at: Option<NaiveDateTime>,
}

impl Opportunity {
    /// Validates the move and computes the new stage columns.
    pub fn plan_stage_change(
        &self,
        next: OpportunityStage,
        now: NaiveDateTime,
    ) -> Result<StageChange, StageTransitionError> {
        if self.deleted_at.is_some() {
            return Err(StageTransitionError::Deleted);
        }
        if self.stage == next {
            return Err(StageTransitionError::Unchanged(next));
        }
        if !self.stage.can_transition_to(next) {
            return Err(StageTransitionError::Closed(self.stage, next));
        }

        Ok(StageChange {
            from: self.stage,
            stage: next,
            probability: next.default_probability(),
            closed_at: next.is_closed().then_some(now),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewOpportunity {
    pub team_id: TeamId,
    pub company_id: Option<CompanyId>,
    pub name: OpportunityName,
    pub amount_cents: i64,
    pub owner_id: Option<MemberId>,
}

impl NewOpportunity {
    /// New opportunities always enter the pipeline at `prospecting`.
    pub const STARTING_STAGE: OpportunityStage = OpportunityStage::Prospecting;
}
