use tracing::{error, info};

use crate::analysis::{self, Review};
use crate::auth::AdminToken;
use crate::domain::{
    Amount, Error, LedgerState, Member, Snapshot,
    ledger::MIN_QUOTA_PER_DAY,
    period,
    traits::{ErrorReporter, LedgerStore},
};
use crate::reconciliation::reconcile;
use crate::settlement::settle_period;
use crate::stats::{Stats, Summary, compute_stats, summarize};
use crate::store::export_json;

/// One line of the member table. New members carry no figures yet.
#[derive(Debug)]
pub struct Row<'a> {
    pub member: &'a Member,
    pub stats: Option<Stats>,
}

/// Owns the ledger. Every change is computed as a new state, adopted, then
/// persisted in full.
#[derive(Debug)]
pub struct Engine<S, R>
where
    S: LedgerStore,
    R: ErrorReporter,
{
    state: LedgerState,
    store: S,
    reporter: R,
}

impl<S, R> Engine<S, R>
where
    S: LedgerStore,
    R: ErrorReporter,
{
    pub fn new(store: S, reporter: R) -> Self {
        let state = store.load();
        Self {
            state,
            store,
            reporter,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Closes the previous period, then applies the new snapshot and starts
    /// the period of the current week.
    pub fn start_new_period(
        &mut self,
        _token: &AdminToken,
        snapshot: &Snapshot,
        now: i64,
    ) -> Result<(), Error> {
        ensure_not_empty(snapshot)?;

        let settled = settle_period(self.state.clone(), self.state.quota_per_day);
        let mut next = reconcile(settled, snapshot, now);
        next.period_start = period::week_start(now);
        next.last_update = now;

        info!(members = next.members.len(), "new period started");
        self.commit(next)
    }

    /// Applies a mid-period snapshot without settling.
    pub fn submit_snapshot(
        &mut self,
        _token: &AdminToken,
        snapshot: &Snapshot,
        now: i64,
    ) -> Result<(), Error> {
        ensure_not_empty(snapshot)?;

        let mut next = reconcile(self.state.clone(), snapshot, now);
        next.last_update = now;
        self.commit(next)
    }

    /// Settles and restarts the period without new readings. Callers confirm
    /// first: every period total is treated as final.
    pub fn reset_period(&mut self, _token: &AdminToken, now: i64) -> Result<(), Error> {
        let mut next = settle_period(self.state.clone(), self.state.quota_per_day);
        for member in next.members.values_mut() {
            member.is_leaving = false;
        }
        next.period_start = period::week_start(now);
        next.last_update = now;

        info!("period reset without readings");
        self.commit(next)
    }

    pub fn set_quota(&mut self, _token: &AdminToken, quota_per_day: Amount) -> Result<(), Error> {
        if quota_per_day < MIN_QUOTA_PER_DAY {
            return Err(Error::Validation(format!(
                "daily quota must be at least {}",
                MIN_QUOTA_PER_DAY
            )));
        }

        let mut next = self.state.clone();
        next.quota_per_day = quota_per_day;
        info!(quota_per_day, "quota changed");
        self.commit(next)
    }

    /// Present members, highest lifetime total first.
    pub fn table(&self, now: i64) -> Vec<Row<'_>> {
        let mut rows: Vec<Row<'_>> = self
            .state
            .members
            .values()
            .filter(|m| !m.absent)
            .map(|member| Row {
                member,
                stats: (!member.is_new).then(|| {
                    compute_stats(
                        member,
                        self.state.quota_per_day,
                        self.state.period_start,
                        now,
                    )
                }),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.member
                .total
                .cmp(&a.member.total)
                .then_with(|| a.member.name.cmp(&b.member.name))
        });
        rows
    }

    pub fn summary(&self, now: i64) -> Summary {
        summarize(&self.state, now)
    }

    pub fn review(&self) -> Review {
        analysis::review(&self.state)
    }

    pub fn export(&self, now: i64) -> Result<String, Error> {
        export_json(&self.state, now)
    }

    /// The new state is kept even when the write fails, so the caller sees
    /// the change; the failure is reported and returned for the caller to warn.
    fn commit(&mut self, next: LedgerState) -> Result<(), Error> {
        self.state = next;
        match self.store.save(&self.state) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "ledger not persisted");
                self.reporter.report(&e);
                Err(e)
            }
        }
    }
}

fn ensure_not_empty(snapshot: &Snapshot) -> Result<(), Error> {
    if snapshot.is_empty() {
        return Err(Error::Parse("snapshot has no rows".to_string()));
    }
    Ok(())
}
