//! Service-level targets for support cases.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::support_case::CasePriority;

/// Resolution targets per priority and escalation thresholds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SlaPolicy {
    pub critical_hours: i64,
    pub high_hours: i64,
    pub medium_hours: i64,
    pub low_hours: i64,
    /// Hours past due at which each escalation level is reached.
    pub escalation_thresholds_hours: Vec<i64>,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_hours: 4,
            high_hours: 8,
            medium_hours: 24,
            low_hours: 72,
            escalation_thresholds_hours: vec![0, 4, 24],
        }
    }
}

impl SlaPolicy {
    /// Resolution target for `priority`; `None` when the configured hours do
    /// not fit a duration.
    pub fn target(&self, priority: CasePriority) -> Option<Duration> {
        let hours = match priority {
            CasePriority::Critical => self.critical_hours,
            CasePriority::High => self.high_hours,
            CasePriority::Medium => self.medium_hours,
            CasePriority::Low => self.low_hours,
        };
        Duration::try_hours(hours)
    }

    /// Due date of a case opened at `opened_at`, or `None` when it falls
    /// outside the representable calendar.
    pub fn due_at(&self, priority: CasePriority, opened_at: NaiveDateTime) -> Option<NaiveDateTime> {
        opened_at.checked_add_signed(self.target(priority)?)
    }

    /// Number of thresholds the breach has crossed; zero while not yet due.
    pub fn escalation_level(&self, due_at: NaiveDateTime, now: NaiveDateTime) -> i32 {
        if now <= due_at {
            return 0;
        }
        let overdue = now - due_at;
        self.escalation_thresholds_hours
            .iter()
            .filter_map(|hours| Duration::try_hours(*hours))
            .filter(|threshold| overdue >= *threshold)
            .count() as i32
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn due_dates_follow_priority() {
        let policy = SlaPolicy::default();
        assert_eq!(policy.due_at(CasePriority::Critical, at(0)), Some(at(4)));
        assert_eq!(policy.due_at(CasePriority::High, at(0)), Some(at(8)));
        assert_eq!(
            policy.due_at(CasePriority::Low, at(0)),
            Some(at(0) + Duration::hours(72))
        );
    }

    #[test]
    fn escalation_levels_grow_with_breach() {
        let policy = SlaPolicy::default();
        let due = at(8);

        assert_eq!(policy.escalation_level(due, at(7)), 0);
        assert_eq!(policy.escalation_level(due, at(8)), 0);
        assert_eq!(policy.escalation_level(due, at(9)), 1);
        assert_eq!(policy.escalation_level(due, at(12)), 2);
        assert_eq!(
            policy.escalation_level(due, due + Duration::hours(30)),
            3
        );
    }

    #[test]
    fn oversized_targets_yield_no_due_date() {
        let policy = SlaPolicy {
            critical_hours: i64::MAX,
            low_hours: 3_000_000_000,
            ..SlaPolicy::default()
        };

        assert_eq!(policy.target(CasePriority::Critical), None);
        assert_eq!(policy.due_at(CasePriority::Critical, at(0)), None);
        assert_eq!(policy.due_at(CasePriority::Low, at(0)), None);
        assert_eq!(policy.due_at(CasePriority::High, at(0)), Some(at(8)));
    }

    #[test]
    fn oversized_thresholds_are_never_reached() {
        let policy = SlaPolicy {
            escalation_thresholds_hours: vec![0, i64::MAX],
            ..SlaPolicy::default()
        };

        assert_eq!(policy.escalation_level(at(0), at(20)), 1);
    }
}
