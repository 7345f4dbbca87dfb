use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Amount, Error, LedgerDefaults, LedgerState, LedgerStore, period};

/// Keeps the ledger as one JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    default_quota_per_day: Amount,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, default_quota_per_day: Amount) -> Self {
        Self {
            path: path.into(),
            default_quota_per_day,
        }
    }

    fn defaults(&self) -> LedgerDefaults {
        LedgerDefaults {
            quota_per_day: self.default_quota_per_day,
            now: period::now_millis(),
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> LedgerState {
        let defaults = self.defaults();
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no ledger yet, starting fresh");
                return LedgerState::new(defaults);
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger unreadable, using defaults");
                return LedgerState::new(defaults);
            }
        };

        match LedgerState::from_json(&raw, defaults) {
            Ok(state) => {
                debug!(members = state.members.len(), "ledger loaded");
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger corrupt, using defaults");
                LedgerState::new(defaults)
            }
        }
    }

    /// Writes a sibling temp file and renames it over the ledger, so a failed
    /// write leaves the previous document intact.
    fn save(&mut self, state: &LedgerState) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        let persistence = |e: std::io::Error| Error::Persistence(format!("{}: {}", self.path.display(), e));

        fs::write(&tmp, json).map_err(persistence)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %cleanup, "temp file left behind");
            }
            return Err(persistence(e));
        }
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}

/// In-memory store holding the serialized document, as a file would.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Option<String>,
    default_quota_per_day: Amount,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(default_quota_per_day: Amount) -> Self {
        Self {
            document: None,
            default_quota_per_day,
            fail_writes: false,
        }
    }

    /// Starts from an already stored document.
    pub fn with_document(mut self, raw: &str) -> Self {
        self.document = Some(raw.to_string());
        self
    }

    /// Makes every following `save` fail.
    pub fn failing(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

#[cfg(test)]
impl LedgerStore for MemoryStore {
    fn load(&self) -> LedgerState {
        let defaults = LedgerDefaults {
            quota_per_day: self.default_quota_per_day,
            now: period::now_millis(),
        };
        self.document
            .as_deref()
            .and_then(|raw| LedgerState::from_json(raw, defaults).ok())
            .unwrap_or_else(|| LedgerState::new(defaults))
    }

    fn save(&mut self, state: &LedgerState) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Persistence("storage is read-only".to_string()));
        }
        self.document = Some(serde_json::to_string(state)?);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    #[serde(flatten)]
    state: &'a LedgerState,
    export_date: String,
}

/// Full ledger plus an `exportDate` stamp. Readable by [`LedgerState::from_json`].
pub fn export_json(state: &LedgerState, now: i64) -> Result<String, Error> {
    let export_date = DateTime::<Utc>::from_timestamp_millis(now)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let document = ExportDocument { state, export_date };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn export_file_name(now: i64) -> String {
    let date = DateTime::<Utc>::from_timestamp_millis(now).unwrap_or_default();
    format!("ledger_backup_{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;
    use crate::domain::ledger::DEFAULT_QUOTA_PER_DAY;
    use tempfile::tempdir;

    fn sample_state() -> LedgerState {
        let mut state = LedgerState::new(LedgerDefaults {
            quota_per_day: 12_000,
            now: 1_700_000_000_000,
        });
        let mut ana = Member::joined("Ana", 4_000, 1_700_000_000_000);
        ana.is_new = false;
        ana.bank = 250;
        ana.total = 9_000;
        state.members.insert("Ana".to_string(), ana);
        state
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("ledger.json"), 9_000);
        let state = store.load();
        assert!(state.members.is_empty());
        assert_eq!(state.quota_per_day, 9_000);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();
        let state = JsonFileStore::new(&path, DEFAULT_QUOTA_PER_DAY).load();
        assert!(state.members.is_empty());
        assert_eq!(state.quota_per_day, DEFAULT_QUOTA_PER_DAY);
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("ledger.json"), DEFAULT_QUOTA_PER_DAY);
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
        assert!(!dir.path().join("ledger.json.tmp").exists());
    }

    #[test]
    fn save_into_missing_directory_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nope/ledger.json"), 1);
        let err = store.save(&sample_state()).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn failed_rename_removes_the_temp_file() {
        let dir = tempdir().unwrap();
        // a directory in the ledger's place makes the rename fail
        let path = dir.path().join("ledger.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut store = JsonFileStore::new(&path, DEFAULT_QUOTA_PER_DAY);
        let err = store.save(&sample_state()).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(!dir.path().join("ledger.json.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn export_reads_back_as_the_same_state() {
        let state = sample_state();
        let json = export_json(&state, 1_700_000_000_000).unwrap();
        assert!(json.contains("\"exportDate\": \"2023-11-14T22:13:20.000Z\""));

        let defaults = LedgerDefaults {
            quota_per_day: DEFAULT_QUOTA_PER_DAY,
            now: 0,
        };
        assert_eq!(LedgerState::from_json(&json, defaults).unwrap(), state);
    }

    #[test]
    fn export_file_is_named_by_date() {
        assert_eq!(
            export_file_name(1_700_000_000_000),
            "ledger_backup_2023-11-14.json"
        );
    }

    #[test]
    fn memory_store_round_trips_and_can_fail() {
        let mut store = MemoryStore::new(DEFAULT_QUOTA_PER_DAY);
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);

        let mut failing = MemoryStore::new(DEFAULT_QUOTA_PER_DAY).failing();
        assert!(failing.save(&state).is_err());
        assert!(failing.document().is_none());
    }
}
