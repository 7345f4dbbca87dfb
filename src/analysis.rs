//! Period performance review: who carried the period and who is falling
//! behind. The review can be rendered locally or handed to an analyzer
//! command as a plain-text brief.

use std::fmt::Write;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::command::ExternalCommand;
use crate::domain::{Amount, Analyzer, Error, LedgerState};
use crate::stats::{Band, ratio};

pub const MVP_COUNT: usize = 3;

/// The figures of one present member for the running period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLine {
    pub name: String,
    pub period_total: Amount,
    pub percent_of_quota: Decimal, // one decimal place
    pub bank: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub quota: Amount,
    pub lines: Vec<MemberLine>,
    pub mvps: Vec<MemberLine>,
    pub at_risk: Vec<MemberLine>,
}

/// Reviews members who are neither absent nor new, on what they donated
/// this period before any bank draw.
pub fn review(state: &LedgerState) -> Review {
    let quota = state.quota_per_period();

    let lines: Vec<MemberLine> = state
        .members
        .values()
        .filter(|m| !m.absent && !m.is_new)
        .map(|m| MemberLine {
            name: m.name.clone(),
            period_total: m.period_total,
            percent_of_quota: ratio(m.period_total, quota, Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
            bank: m.bank,
            total: m.total,
        })
        .collect();

    let mut mvps: Vec<MemberLine> = lines
        .iter()
        .filter(|l| l.period_total > 0)
        .cloned()
        .collect();
    mvps.sort_by(|a, b| {
        b.period_total
            .cmp(&a.period_total)
            .then_with(|| a.name.cmp(&b.name))
    });
    mvps.truncate(MVP_COUNT);

    let mut at_risk: Vec<MemberLine> = lines
        .iter()
        .filter(|l| Band::of(ratio(l.period_total, quota, Decimal::ONE_HUNDRED)) == Band::Red)
        .cloned()
        .collect();
    at_risk.sort_by(|a, b| {
        a.period_total
            .cmp(&b.period_total)
            .then_with(|| a.name.cmp(&b.name))
    });

    Review {
        quota,
        lines,
        mvps,
        at_risk,
    }
}

/// Plain report used when no analyzer is configured.
pub fn render_review(review: &Review) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Period quota: {}", review.quota);

    let _ = writeln!(out, "\nTop contributors:");
    if review.mvps.is_empty() {
        let _ = writeln!(out, "none");
    }
    for (rank, line) in review.mvps.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}: {} ({}%)",
            rank + 1,
            line.name,
            line.period_total,
            line.percent_of_quota
        );
    }

    let _ = writeln!(out, "\nBelow 70% of quota:");
    if review.at_risk.is_empty() {
        let _ = writeln!(out, "none");
    }
    for line in &review.at_risk {
        let _ = writeln!(
            out,
            "- {}: {} ({}%)",
            line.name, line.period_total, line.percent_of_quota
        );
    }
    out
}

/// The text handed to an analyzer: every member's figures and what to write.
pub fn brief(review: &Review) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Review the donation figures of a team for the current period."
    );
    let _ = writeln!(out, "Each member's quota for the period is {}.", review.quota);
    let _ = writeln!(out, "\nFigures:");
    for line in &review.lines {
        let _ = writeln!(
            out,
            "- {}: donated {} ({}% of quota). Bank: {}. Lifetime total: {}.",
            line.name, line.period_total, line.percent_of_quota, line.bank, line.total
        );
    }
    let _ = writeln!(out, "\nWrite a short Markdown report:");
    let _ = writeln!(
        out,
        "1. Name the top {} contributors of the period.",
        MVP_COUNT
    );
    let _ = writeln!(out, "2. List the members below 70% of the quota.");
    let _ = writeln!(out, "3. Close with a brief, encouraging note for the team lead.");
    out
}

/// Hands the brief to an external command on stdin and takes its stdout as
/// the report.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    command: ExternalCommand,
}

impl CommandAnalyzer {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    pub fn from_command_line(command_line: &str) -> Result<Self, Error> {
        ExternalCommand::from_command_line(command_line)
            .map(Self::new)
            .ok_or_else(|| Error::Validation("analyzer command is empty".to_string()))
    }

    async fn run(&self, brief: &str) -> Result<String, Error> {
        let report = self.command.pipe(brief.as_bytes(), Error::Analysis).await?;
        let report = report.trim();
        if report.is_empty() {
            return Err(Error::Analysis("analyzer returned no report".to_string()));
        }
        Ok(report.to_string())
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(
        &self,
        brief: &str,
    ) -> impl std::future::Future<Output = Result<String, Error>> + Send {
        self.run(brief)
    }
}
