//! Read-only display figures. Mirrors the settlement arithmetic so that the
//! projected bank matches what closing the period now would produce.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{
    Amount, LedgerState, Member,
    period::{self, PERIOD_LENGTH_DAYS},
};

/// Colour band of a member's progress towards the period quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Green,
    Yellow,
    Red,
}

impl Band {
    pub fn of(percent_of_quota: Decimal) -> Self {
        if percent_of_quota >= Decimal::from(90) {
            Band::Green
        } else if percent_of_quota >= Decimal::from(70) {
            Band::Yellow
        } else {
            Band::Red
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Band::Green => "green",
            Band::Yellow => "yellow",
            Band::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub deficit_draw: Amount,
    pub effective_period_total: Amount,
    pub avg_daily: Decimal,
    pub avg_daily_percent: Decimal,
    pub percent_of_quota: Decimal,
    pub projected_excess: Amount,
    pub projected_bank: Amount,
    pub buffer_days: u64, // whole days of quota the projected bank covers
    pub band: Band,
}

pub fn compute_stats(member: &Member, quota_per_day: Amount, period_start: i64, now: i64) -> Stats {
    let days_elapsed = period::days_elapsed(period_start, now);
    let quota = quota_per_day.saturating_mul(PERIOD_LENGTH_DAYS);

    let deficit_draw = if member.period_total < quota {
        (quota - member.period_total).min(member.bank)
    } else {
        0
    };
    let effective_period_total = member.period_total.saturating_add(deficit_draw);
    let projected_excess = member.period_total.saturating_sub(quota);
    let projected_bank = (member.bank - deficit_draw).saturating_add(projected_excess);

    let avg_daily = ratio(effective_period_total, days_elapsed, Decimal::ONE);
    let avg_daily_percent = if quota_per_day == 0 {
        Decimal::ZERO
    } else {
        avg_daily / Decimal::from(quota_per_day) * Decimal::ONE_HUNDRED
    };
    let percent_of_quota = ratio(effective_period_total, quota, Decimal::ONE_HUNDRED);

    Stats {
        deficit_draw,
        effective_period_total,
        avg_daily: round(avg_daily),
        avg_daily_percent: round(avg_daily_percent),
        percent_of_quota: round(percent_of_quota),
        projected_excess,
        projected_bank,
        buffer_days: projected_bank.checked_div(quota_per_day).unwrap_or(0),
        band: Band::of(percent_of_quota),
    }
}

pub(crate) fn ratio(numerator: Amount, denominator: Amount, scale: Decimal) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator) * scale / Decimal::from(denominator)
}

fn round(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Footer totals over members who are neither absent nor new.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub quota: Amount,
    pub days_elapsed: u64,
    pub active: usize,
    pub new: usize,
    pub leaving: usize,
    pub period_total: Amount,
    pub bank: Amount,
    pub total: Amount,
}

pub fn summarize(state: &LedgerState, now: i64) -> Summary {
    let mut summary = Summary {
        quota: state.quota_per_period(),
        days_elapsed: period::days_elapsed(state.period_start, now),
        ..Summary::default()
    };

    for member in state.members.values() {
        if member.is_leaving {
            summary.leaving += 1;
        }
        if member.absent {
            continue;
        }
        if member.is_new {
            summary.new += 1;
            continue;
        }

        let stats = compute_stats(member, state.quota_per_day, state.period_start, now);
        summary.active += 1;
        summary.period_total = summary.period_total.saturating_add(stats.effective_period_total);
        summary.bank = summary.bank.saturating_add(member.bank);
        summary.total = summary.total.saturating_add(member.total);
    }

    summary
}
