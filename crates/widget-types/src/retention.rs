//! Plan-based retention policy.

use crate::domain::Plan;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retention window for the three owner-scoped artifacts a plan governs:
/// widget records, submission lists, and stats buckets all share one TTL
/// per plan in this implementation (a future plan tier could split these
/// out if they ever needed different windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRetention {
    pub days: u32,
}

impl PlanRetention {
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.days as u64 * 24 * 60 * 60)
    }

    pub fn as_seconds(&self) -> i64 {
        self.days as i64 * 24 * 60 * 60
    }
}

/// Resolves a plan to its configured retention. Built from `TTL_FREE_DAYS` /
/// `TTL_PRO_DAYS` at startup; defaults to 7 days free / 90 days pro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionTable {
    free_days: u32,
    pro_days: u32,
}

impl Default for RetentionTable {
    fn default() -> Self {
        Self {
            free_days: 7,
            pro_days: 90,
        }
    }
}

impl RetentionTable {
    pub fn new(free_days: u32, pro_days: u32) -> Self {
        Self {
            free_days,
            pro_days,
        }
    }

    pub fn for_plan(&self, plan: Plan) -> PlanRetention {
        let days = match plan {
            Plan::Free => self.free_days,
            Plan::Pro => self.pro_days,
        };
        PlanRetention { days }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_seven_and_ninety_days() {
        let table = RetentionTable::default();
        assert_eq!(table.for_plan(Plan::Free).days, 7);
        assert_eq!(table.for_plan(Plan::Pro).days, 90);
    }

    #[test]
    fn pro_retention_is_longer_than_free() {
        let table = RetentionTable::new(3, 30);
        assert!(table.for_plan(Plan::Pro).as_seconds() > table.for_plan(Plan::Free).as_seconds());
    }
}
