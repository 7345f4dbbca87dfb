use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// Cumulative donation counters are non-negative whole numbers.
pub type Amount = u64;

/// Keeps only the digits of `s`, so `"12.500"`, `"12,500"` and `"12 500 pts"`
/// all read as 12500. `None` when there is no digit at all.
pub fn digits_only(s: &str) -> Option<Amount> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parses a single amount token as it is shown in the game: plain digits with
/// optional thousands separators, or a short form with a `k`/`m` suffix where
/// the separator is a decimal mark (`"25k"`, `"1.2m"`, `"3,5k"`).
pub fn parse_amount(s: &str) -> Option<Amount> {
    let s = s.trim();
    if s.is_empty() || s.starts_with('-') {
        return None;
    }

    let lower = s.to_ascii_lowercase();
    let (body, factor) = match lower.chars().last()? {
        'k' => (&lower[..lower.len() - 1], 1_000u64),
        'm' => (&lower[..lower.len() - 1], 1_000_000u64),
        _ => (lower.as_str(), 1),
    };
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if factor == 1 {
        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | ' '))
        {
            return None;
        }
        return digits_only(body);
    }

    let normalized = body.replace(',', ".");
    let value = Decimal::from_str(&normalized).ok()?;
    if value.is_sign_negative() {
        return None;
    }
    value.checked_mul(Decimal::from(factor))?.trunc().to_u64()
}
