use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Error, Member, period};

/// One reading of every member's cumulative donation counter.
pub type Snapshot = BTreeMap<String, Amount>;

pub const DEFAULT_QUOTA_PER_DAY: Amount = 15_000;
pub const MIN_QUOTA_PER_DAY: Amount = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub members: BTreeMap<String, Member>,
    pub quota_per_day: Amount,
    pub period_start: i64,
    pub last_update: i64,
}

/// Values used for anything a stored document leaves out.
#[derive(Debug, Clone, Copy)]
pub struct LedgerDefaults {
    pub quota_per_day: Amount,
    pub now: i64,
}

impl LedgerState {
    pub fn new(defaults: LedgerDefaults) -> Self {
        Self {
            members: BTreeMap::new(),
            quota_per_day: defaults.quota_per_day,
            period_start: period::week_start(defaults.now),
            last_update: defaults.now,
        }
    }

    pub fn quota_per_period(&self) -> Amount {
        self.quota_per_day.saturating_mul(period::PERIOD_LENGTH_DAYS)
    }

    /// Reads a stored or exported document. Missing fields take their defaults,
    /// unknown fields are ignored, a document of the wrong shape is an error.
    pub fn from_json(raw: &str, defaults: LedgerDefaults) -> Result<Self, Error> {
        let stored: StoredLedger = serde_json::from_str(raw)?;
        Ok(stored.into_state(defaults))
    }
}

/// On-disk shape. Also accepts the field names of older backups
/// (`players`, `goalDaily`, `weekStart`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLedger {
    #[serde(default, alias = "players")]
    members: Option<BTreeMap<String, Member>>,
    #[serde(default, alias = "goalDaily")]
    quota_per_day: Option<Amount>,
    #[serde(default, alias = "weekStart")]
    period_start: Option<i64>,
    #[serde(default)]
    last_update: Option<i64>,
}

impl StoredLedger {
    fn into_state(self, defaults: LedgerDefaults) -> LedgerState {
        let members = self
            .members
            .unwrap_or_default()
            .into_iter()
            .map(|(key, mut member)| {
                // the map key is the identity
                member.name = key.clone();
                // a record can't be both joining and leaving
                if member.is_new && member.is_leaving {
                    member.is_leaving = false;
                }
                (key, member)
            })
            .collect();

        LedgerState {
            members,
            quota_per_day: self
                .quota_per_day
                .filter(|q| *q > 0)
                .unwrap_or(defaults.quota_per_day),
            period_start: self
                .period_start
                .unwrap_or_else(|| period::week_start(defaults.now)),
            last_update: self.last_update.unwrap_or(defaults.now),
        }
    }
}
