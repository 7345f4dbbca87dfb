use tracing::error;

use crate::domain::{Error, ErrorReporter};

/// Logs skipped errors so they show up next to the run's other output.
#[derive(Default, Debug)]
pub struct TracingReporter {}

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &Error) {
        error!(%error, "recoverable error");
    }
}
