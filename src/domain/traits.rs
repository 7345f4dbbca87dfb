use std::future::Future;

use crate::domain::{Error, LedgerState, Snapshot};

/// Where the ledger lives between runs.
pub trait LedgerStore {
    /// Never fails: unreadable or missing data yields a default state.
    fn load(&self) -> LedgerState;
    fn save(&mut self, state: &LedgerState) -> Result<(), Error>;
}

/// Reads a donation leaderboard screenshot into `name -> amount`.
pub trait ImageExtractor {
    fn extract(&self, image: &[u8]) -> impl Future<Output = Result<Snapshot, Error>> + Send;
}

/// Turns a plain-text performance brief into a written report.
pub trait Analyzer {
    fn analyze(&self, brief: &str) -> impl Future<Output = Result<String, Error>> + Send;
}

/// Sink for recoverable errors that are skipped rather than returned.
pub trait ErrorReporter {
    fn report(&self, error: &Error);
}
