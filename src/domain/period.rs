use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};

pub const PERIOD_LENGTH_DAYS: u64 = 7;
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Most recent Monday 00:00 in local time, in epoch milliseconds.
pub fn week_start(now: i64) -> i64 {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(now) else {
        return now;
    };
    let local = utc.with_timezone(&Local);
    let monday =
        local.date_naive() - Duration::days(i64::from(local.weekday().num_days_from_monday()));
    let midnight = monday.and_time(NaiveTime::MIN);

    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        // midnight skipped by a DST jump
        LocalResult::None => midnight.and_utc().timestamp_millis(),
    }
}

/// Whole days since `period_start`, rounded up, never below one.
pub fn days_elapsed(period_start: i64, now: i64) -> u64 {
    let elapsed = now.saturating_sub(period_start);
    if elapsed <= 0 {
        return 1;
    }
    (elapsed as u64).div_ceil(DAY_MILLIS as u64).max(1)
}
