use std::io::Write;

use crate::domain::Error;
use crate::engine::Row;
use crate::stats::Summary;

const TABLE_HEADER: [&str; 15] = [
    "name",
    "previous",
    "current",
    "period_total",
    "deficit_draw",
    "avg_daily",
    "avg_daily_percent",
    "percent_of_quota",
    "band",
    "bank",
    "projected_excess",
    "projected_bank",
    "buffer_days",
    "total",
    "status",
];

/// Writes the member table as CSV. New members only show their counters.
pub fn write_table<W: Write>(writer: W, rows: &[Row<'_>]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(TABLE_HEADER).map_err(csv_error)?;

    for row in rows {
        let m = row.member;
        let record = match &row.stats {
            Some(stats) => [
                m.name.clone(),
                m.previous.to_string(),
                m.current.to_string(),
                stats.effective_period_total.to_string(),
                stats.deficit_draw.to_string(),
                stats.avg_daily.to_string(),
                stats.avg_daily_percent.to_string(),
                stats.percent_of_quota.to_string(),
                stats.band.as_str().to_string(),
                m.bank.to_string(),
                stats.projected_excess.to_string(),
                stats.projected_bank.to_string(),
                stats.buffer_days.to_string(),
                m.total.to_string(),
                "active".to_string(),
            ],
            None => {
                let mut record: [String; 15] = Default::default();
                record[0] = m.name.clone();
                record[1] = m.previous.to_string();
                record[2] = m.current.to_string();
                record[14] = "new".to_string();
                record
            }
        };
        wtr.write_record(&record).map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_summary<W: Write>(writer: W, summary: &Summary) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "quota",
        "days_elapsed",
        "active",
        "new",
        "leaving",
        "period_total",
        "bank",
        "total",
    ])
    .map_err(csv_error)?;
    wtr.write_record([
        summary.quota.to_string(),
        summary.days_elapsed.to_string(),
        summary.active.to_string(),
        summary.new.to_string(),
        summary.leaving.to_string(),
        summary.period_total.to_string(),
        summary.bank.to_string(),
        summary.total.to_string(),
    ])
    .map_err(csv_error)?;
    wtr.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> Error {
    Error::IO(std::io::Error::other(e))
}
