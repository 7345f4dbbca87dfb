mod analysis;
mod auth;
mod command;
mod config;
mod domain;
mod engine;
mod extraction;
mod ingestion;
mod reconciliation;
mod report;
mod reporter;
mod settlement;
mod stats;
mod store;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::analysis::{brief, render_review};
use crate::domain::{Amount, Analyzer, Error, ErrorReporter, Snapshot, period};
use crate::engine::Engine;
use crate::extraction::{ImageInput, extract_all, format_draft};
use crate::ingestion::ManualEntryReader;
use crate::reporter::TracingReporter;

/// Tracks member donations against a weekly quota, with a bank that carries
/// surplus over to cover later shortfalls.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[clap(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
struct AuthArgs {
    /// Admin passphrase.
    #[arg(long, env = "LEDGER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the member table and totals as CSV.
    Show,
    /// Close the current period, then apply a snapshot (`Name, Amount` lines; `-` for stdin).
    StartPeriod {
        input: PathBuf,
        #[clap(flatten)]
        auth: AuthArgs,
    },
    /// Apply a snapshot within the current period.
    Submit {
        input: PathBuf,
        #[clap(flatten)]
        auth: AuthArgs,
    },
    /// Close the current period without new readings.
    ResetPeriod {
        /// Confirm that every period total is final.
        #[arg(long)]
        yes: bool,
        #[clap(flatten)]
        auth: AuthArgs,
    },
    /// Change the daily quota.
    SetQuota {
        quota_per_day: Amount,
        #[clap(flatten)]
        auth: AuthArgs,
    },
    /// Read leaderboard screenshots into a draft snapshot.
    Extract {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Review the period: top contributors and members below 70% of quota.
    /// Goes through the configured analyzer when there is one.
    Analyze,
    /// Write the whole ledger as a JSON backup.
    Export {
        /// Destination file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = cli.config;
    let now = period::now_millis();

    match cli.command {
        Commands::Show => {
            let engine = Engine::new(config.store(), TracingReporter::default());
            let mut out = io::stdout().lock();
            report::write_table(&mut out, &engine.table(now))?;
            writeln!(out)?;
            report::write_summary(&mut out, &engine.summary(now))?;
        }
        Commands::StartPeriod { input, auth } => {
            let snapshot = read_snapshot(&input)?;
            let token = config.admin_gate().authorize(&auth.password.unwrap_or_default())?;
            let mut engine = Engine::new(config.store(), TracingReporter::default());
            engine.start_new_period(&token, &snapshot, now)?;
            info!(readings = snapshot.len(), "period started");
        }
        Commands::Submit { input, auth } => {
            let snapshot = read_snapshot(&input)?;
            let token = config.admin_gate().authorize(&auth.password.unwrap_or_default())?;
            let mut engine = Engine::new(config.store(), TracingReporter::default());
            engine.submit_snapshot(&token, &snapshot, now)?;
            info!(readings = snapshot.len(), "snapshot applied");
        }
        Commands::ResetPeriod { yes, auth } => {
            if !yes {
                return Err(Error::Validation(
                    "resetting settles every member as-is, pass --yes to confirm".to_string(),
                ));
            }
            let token = config.admin_gate().authorize(&auth.password.unwrap_or_default())?;
            let mut engine = Engine::new(config.store(), TracingReporter::default());
            engine.reset_period(&token, now)?;
        }
        Commands::SetQuota {
            quota_per_day,
            auth,
        } => {
            let token = config.admin_gate().authorize(&auth.password.unwrap_or_default())?;
            let mut engine = Engine::new(config.store(), TracingReporter::default());
            engine.set_quota(&token, quota_per_day)?;
        }
        Commands::Extract { images } => {
            let extractor = config.extractor()?;
            let reporter = TracingReporter::default();
            let inputs = read_images(&images, &reporter).await;
            let snapshot = extract_all(&extractor, &inputs, &reporter).await?;
            println!("{}", format_draft(&snapshot));
        }
        Commands::Analyze => {
            let engine = Engine::new(config.store(), TracingReporter::default());
            let review = engine.review();
            match config.analyzer()? {
                Some(analyzer) => {
                    info!(members = review.lines.len(), "sending review to analyzer");
                    println!("{}", analyzer.analyze(&brief(&review)).await?);
                }
                None => print!("{}", render_review(&review)),
            }
        }
        Commands::Export { output } => {
            let engine = Engine::new(config.store(), TracingReporter::default());
            let json = engine.export(now)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!(path = %path.display(), "ledger exported");
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn read_snapshot(input: &Path) -> Result<Snapshot, Error> {
    let reader = if input == Path::new("-") {
        ManualEntryReader::from_reader(io::stdin().lock())?
    } else {
        ManualEntryReader::from_reader(File::open(input)?)?
    };
    reader.read()
}

/// Unreadable files are reported and left out, like images the extractor
/// can't read.
async fn read_images<R: ErrorReporter>(paths: &[PathBuf], reporter: &R) -> Vec<ImageInput> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::read(path).await {
            Ok(bytes) => inputs.push(ImageInput {
                label: path.display().to_string(),
                bytes,
            }),
            Err(e) => reporter.report(&Error::Extraction(format!("{}: {}", path.display(), e))),
        }
    }
    inputs
}
