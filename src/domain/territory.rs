//! Sales territories and rule matching against lead attributes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::lead::{Lead, LeadField};
use crate::domain::types::{MemberId, TeamId, TerritoryId, TerritoryName};

/// Attribute-equality rule: `field` must equal `value` (case-insensitive).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerritoryRule {
    pub field: LeadField,
    pub value: String,
}

impl TerritoryRule {
    pub fn new(field: LeadField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into().trim().to_string(),
        }
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        lead.attribute(self.field)
            .is_some_and(|actual| same_value(actual, &self.value))
    }
}

fn same_value(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Territory {
    pub id: TerritoryId,
    pub team_id: TeamId,
    pub name: TerritoryName,
    pub owner_id: MemberId,
    /// Lower values are evaluated first.
    pub priority: i32,
    pub rules: Vec<TerritoryRule>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Territory {
    /// All rules must match; a territory without rules matches nothing.
    pub fn matches(&self, lead: &Lead) -> bool {
        self.is_active && !self.rules.is_empty() && self.rules.iter().all(|r| r.matches(lead))
    }
}

/// First active territory matching the lead by `(priority, id)`.
pub fn first_matching<'a>(territories: &'a [Territory], lead: &Lead) -> Option<&'a Territory> {
    territories
        .iter()
        .filter(|t| t.matches(lead))
        .min_by_key(|t| (t.priority, t.id))
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTerritory {
    pub team_id: TeamId,
    pub name: TerritoryName,
    pub owner_id: MemberId,
    pub priority: i32,
    pub rules: Vec<TerritoryRule>,
}

/// Two territories that a single lead could satisfy at once.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TerritoryOverlap {
    pub first: TerritoryId,
    pub second: TerritoryId,
    /// Fields constrained by both territories (all with equal values).
    pub shared_fields: Vec<LeadField>,
}

/// Collapses a rule list to one value per field, or `None` if contradictory.
fn constraints(rules: &[TerritoryRule]) -> Option<Vec<(LeadField, String)>> {
    let mut result: Vec<(LeadField, String)> = Vec::new();
    for rule in rules {
        let existing = result
            .iter()
            .find(|(field, _)| *field == rule.field)
            .map(|(_, value)| value.clone());
        match existing {
            Some(value) if !same_value(&value, &rule.value) => return None,
            Some(_) => {}
            None => result.push((rule.field, rule.value.clone())),
        }
    }
    Some(result)
}

/// Pairs of active territories whose rule sets are jointly satisfiable.
pub fn find_overlaps(territories: &[Territory]) -> Vec<TerritoryOverlap> {
    let active: Vec<(&Territory, Vec<(LeadField, String)>)> = territories
        .iter()
        .filter(|t| t.is_active && !t.rules.is_empty())
        .filter_map(|t| constraints(&t.rules).map(|c| (t, c)))
        .collect();

    let mut overlaps = Vec::new();
    for (i, (left, left_rules)) in active.iter().enumerate() {
        for (right, right_rules) in active.iter().skip(i + 1) {
            let mut shared_fields = Vec::new();
            let mut compatible = true;
            for (field, value) in left_rules {
                if let Some((_, other)) = right_rules.iter().find(|(f, _)| f == field) {
                    if same_value(value, other) {
                        shared_fields.push(*field);
                    } else {
                        compatible = false;
                        break;
                    }
                }
            }
            if compatible {
                let (first, second) = if left.id < right.id {
                    (left.id, right.id)
                } else {
                    (right.id, left.id)
                };
                overlaps.push(TerritoryOverlap {
                    first,
                    second,
                    shared_fields,
                });
            }
        }
    }
    overlaps
}
