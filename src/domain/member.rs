use serde::{Deserialize, Serialize};

use crate::domain::Amount;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    pub name: String,
    pub previous: Amount, // counter value at the start of the current period
    pub current: Amount,  // latest observed counter value
    #[serde(alias = "weeklyTotal")]
    pub period_total: Amount, // positive deltas within the current period
    #[serde(alias = "accumulatedExcess")]
    pub bank: Amount, // surplus carried over from past periods
    pub total: Amount, // lifetime credited contribution, never decreases
    pub last_seen: i64,
    pub absent: bool,
    pub is_new: bool,
    pub is_leaving: bool,
}

impl Member {
    /// A member first observed in a snapshot. Its counter is the baseline, so
    /// nothing is credited until the next reading.
    pub fn joined(name: &str, amount: Amount, now: i64) -> Self {
        Self {
            name: name.to_string(),
            previous: amount,
            current: amount,
            period_total: 0,
            bank: 0,
            total: 0,
            last_seen: now,
            absent: false,
            is_new: true,
            is_leaving: false,
        }
    }
}
