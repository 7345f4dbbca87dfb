use std::io::Read;

use tracing::debug;

use crate::domain::amount::{digits_only, parse_amount};
use crate::domain::{Amount, Error, Snapshot};

/// Reads the hand-typed (or extracted, then edited) `Name, Amount` form.
///
/// Each line is split on commas when it has one, otherwise on tabs. Lines
/// with a single field fall back to `Some Name 12345`, where the last
/// whitespace-separated token is the amount.
pub struct ManualEntryReader {
    text: String,
}

impl ManualEntryReader {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::new(text))
    }

    /// Rows that don't yield both a name and an amount are dropped. A text
    /// with no valid row at all is an error rather than an empty snapshot.
    pub fn read(&self) -> Result<Snapshot, Error> {
        let mut snapshot = Snapshot::new();

        for (line_no, line) in self.text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((name, amount)) => {
                    snapshot.insert(name, amount);
                }
                None => debug!(line = line_no + 1, "skipping malformed row"),
            }
        }

        if snapshot.is_empty() {
            return Err(Error::Parse(
                "no valid rows found, expected `Name, Amount`".to_string(),
            ));
        }
        Ok(snapshot)
    }
}

fn parse_line(line: &str) -> Option<(String, Amount)> {
    let delimiter = if line.contains(',') { b',' } else { b'\t' };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match rdr.read_record(&mut record) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            debug!(error = %e, "CSV read error");
            return None;
        }
    }

    if record.len() < 2 {
        return split_on_whitespace(line);
    }

    let name = record.get(0).unwrap_or_default().trim();
    let amount = record.get(record.len() - 1).and_then(digits_only)?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), amount))
}

fn split_on_whitespace(line: &str) -> Option<(String, Amount)> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    let amount = parse_amount(tokens.pop()?)?;
    let name = tokens.join(" ");
    if name.is_empty() {
        return None;
    }
    Some((name, amount))
}
