use std::path::PathBuf;

use clap::Args;

use crate::analysis::CommandAnalyzer;
use crate::auth::AdminGate;
use crate::domain::{Amount, Error, ledger::DEFAULT_QUOTA_PER_DAY};
use crate::extraction::CommandExtractor;
use crate::store::JsonFileStore;

/// Options shared by every command. Each one can also come from the
/// environment.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Ledger document to read and write.
    #[arg(global = true, long, env = "LEDGER_STORE", default_value = "ledger.json")]
    pub store: PathBuf,

    /// Daily quota used when the ledger doesn't have one yet.
    #[arg(global = true, long, env = "LEDGER_DEFAULT_QUOTA", default_value_t = DEFAULT_QUOTA_PER_DAY)]
    pub default_quota: Amount,

    /// Command that turns a screenshot on stdin into `{"name": amount}` JSON.
    #[arg(global = true, long, env = "LEDGER_EXTRACTOR")]
    pub extractor: Option<String>,

    /// Command that turns a plain-text performance brief on stdin into a report.
    #[arg(global = true, long, env = "LEDGER_ANALYZER")]
    pub analyzer: Option<String>,

    /// Shared admin passphrase. Mutating commands are refused without it.
    #[arg(global = true, long, env = "LEDGER_ADMIN_SECRET", hide = true, hide_env_values = true)]
    pub admin_secret: Option<String>,
}

impl Config {
    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.store, self.default_quota)
    }

    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(self.admin_secret.clone())
    }

    pub fn extractor(&self) -> Result<CommandExtractor, Error> {
        let command_line = self.extractor.as_deref().ok_or_else(|| {
            Error::Validation("no extractor configured, set LEDGER_EXTRACTOR".to_string())
        })?;
        CommandExtractor::from_command_line(command_line)
    }

    /// `None` when no analyzer is configured; callers fall back to the local review.
    pub fn analyzer(&self) -> Result<Option<CommandAnalyzer>, Error> {
        self.analyzer
            .as_deref()
            .map(CommandAnalyzer::from_command_line)
            .transpose()
    }
}
