use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::command::ExternalCommand;
use crate::domain::amount::parse_amount;
use crate::domain::{Amount, Error, ErrorReporter, ImageExtractor, Snapshot};

/// A screenshot waiting to be read, labelled for error reports.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Delegates the image reading to an external command: the image is written
/// to its stdin and a JSON object `{"Name": 1234}` is expected on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: ExternalCommand,
}

impl CommandExtractor {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    pub fn from_command_line(command_line: &str) -> Result<Self, Error> {
        ExternalCommand::from_command_line(command_line)
            .map(Self::new)
            .ok_or_else(|| Error::Validation("extractor command is empty".to_string()))
    }

    async fn run(&self, image: &[u8]) -> Result<Snapshot, Error> {
        let stdout = self.command.pipe(image, Error::Extraction).await?;
        parse_extraction_output(&stdout)
    }
}

impl ImageExtractor for CommandExtractor {
    fn extract(
        &self,
        image: &[u8],
    ) -> impl std::future::Future<Output = Result<Snapshot, Error>> + Send {
        self.run(image)
    }
}

/// Reads the `name -> amount` object a vision model answers with. Markdown
/// code fences around the JSON are tolerated; entries whose value is not a
/// non-negative amount are dropped.
pub fn parse_extraction_output(raw: &str) -> Result<Snapshot, Error> {
    let body = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Extraction(format!("unparsable output: {}", e)))?;
    let Value::Object(entries) = value else {
        return Err(Error::Extraction("output is not a JSON object".to_string()));
    };

    let snapshot: Snapshot = entries
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.trim().to_string();
            let amount = json_amount(&value)?;
            (!name.is_empty()).then_some((name, amount))
        })
        .collect();

    if snapshot.is_empty() {
        return Err(Error::Extraction("no rows in output".to_string()));
    }
    Ok(snapshot)
}

fn json_amount(value: &Value) -> Option<Amount> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as Amount)),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop an optional language tag on the opening fence
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Reads every image concurrently and merges what could be read. Failed
/// images are reported and skipped; later images win on a name collision.
pub async fn extract_all<E, R>(
    extractor: &E,
    images: &[ImageInput],
    reporter: &R,
) -> Result<Snapshot, Error>
where
    E: ImageExtractor,
    R: ErrorReporter,
{
    if images.is_empty() {
        return Err(Error::Extraction("no images given".to_string()));
    }

    let results = join_all(images.iter().map(|image| extractor.extract(&image.bytes))).await;

    let mut combined = Snapshot::new();
    let mut succeeded = 0usize;
    for (image, result) in images.iter().zip(results) {
        match result {
            Ok(rows) => {
                info!(image = %image.label, rows = rows.len(), "image read");
                combined.extend(rows);
                succeeded += 1;
            }
            Err(e) => {
                warn!(image = %image.label, "image skipped");
                reporter.report(&Error::Extraction(format!("{}: {}", image.label, e)));
            }
        }
    }

    if succeeded == 0 {
        return Err(Error::Extraction(
            "could not read any of the selected images".to_string(),
        ));
    }
    Ok(combined)
}

/// Renders a snapshot as the editable `Name, Amount` draft text.
pub fn format_draft(snapshot: &Snapshot) -> String {
    snapshot
        .iter()
        .map(|(name, amount)| format!("{}, {}", name, amount))
        .collect::<Vec<_>>()
        .join("\n")
}
