//! Strategies for choosing which team member receives a lead.
//!
//! The pickers are pure: they receive the eligible members (active, same
//! team, sorted by id) and whatever state the strategy depends on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::member::Member;
use crate::domain::types::{MemberId, label_enum};

label_enum!(AssignmentStrategy, "How a lead owner is chosen.", {
    RoundRobin => "round_robin",
    Territory => "territory",
    Weighted => "weighted",
});

/// Result of an assignment attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentDecision {
    pub strategy: AssignmentStrategy,
    /// `None` when no eligible member could be chosen.
    pub member_id: Option<MemberId>,
}

/// First member after the cursor, wrapping to the lowest id.
pub fn pick_round_robin(members: &[Member], cursor: Option<MemberId>) -> Option<&Member> {
    let mut sorted: Vec<&Member> = members.iter().filter(|m| m.is_active).collect();
    sorted.sort_by_key(|m| m.id);

    let after_cursor = cursor.and_then(|last| sorted.iter().copied().find(|m| m.id > last));
    after_cursor.or_else(|| sorted.first().copied())
}

/// Member with the fewest open leads; ties go to the lowest id.
pub fn pick_least_loaded<'a>(
    members: &'a [Member],
    loads: &HashMap<MemberId, i64>,
) -> Option<&'a Member> {
    members
        .iter()
        .filter(|m| m.is_active)
        .min_by_key(|m| (loads.get(&m.id).copied().unwrap_or(0), m.id))
}
