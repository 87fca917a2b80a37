//! Field-level coercion for uploaded sales rows.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S", "%m/%d/%Y %H:%M:%S"];
const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₽'];

/// Tries each supported date layout in order; the first that parses wins.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Whole units, truncating any fractional part. Sign is preserved so the
/// caller can decide how to treat negatives.
pub fn parse_units(raw: &str) -> Option<i64> {
    let cleaned = strip_grouping(raw.trim());
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    let value = cleaned.parse::<f64>().ok().filter(|value| value.is_finite())?;
    let truncated = value.trunc();
    (truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64).then_some(truncated as i64)
}

pub fn parse_revenue(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let unsigned = unsigned
        .strip_prefix(|ch: char| CURRENCY_SYMBOLS.contains(&ch))
        .unwrap_or(unsigned)
        .trim_start();
    let cleaned = strip_grouping(unsigned);
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned)).ok()?;
    Some(if negative { -value } else { value })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidValue;

/// Blank input is `Ok(None)`; a decimal comma is accepted.
pub fn parse_temperature(raw: &str) -> Result<Option<f64>, InvalidValue> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .or_else(|_| value.replacen(',', ".", 1).parse::<f64>())
        .ok()
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or(InvalidValue)
}

fn strip_grouping(value: &str) -> String {
    value.chars().filter(|ch| *ch != ',' && !ch.is_whitespace() && *ch != '\u{a0}').collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{parse_date, parse_revenue, parse_temperature, parse_units, InvalidValue};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn parses_every_supported_date_layout() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("15.01.2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("01/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15 08:30:00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("15.01.2024 23:59:59"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(" 01/15/2024 00:00:00 "), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn rejects_unknown_date_layouts() {
        assert_eq!(parse_date("Jan 15 2024"), None);
        assert_eq!(parse_date("2024/01/15"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn units_strip_thousands_separators_and_truncate() {
        assert_eq!(parse_units("1,250"), Some(1250));
        assert_eq!(parse_units("7.9"), Some(7));
        assert_eq!(parse_units("-5"), Some(-5));
        assert_eq!(parse_units("many"), None);
        assert_eq!(parse_units("  "), None);
    }

    #[test]
    fn revenue_strips_currency_symbol_and_grouping() {
        assert_eq!(parse_revenue("$15,000.50"), Some(Decimal::new(1_500_050, 2)));
        assert_eq!(parse_revenue("9500"), Some(Decimal::new(9500, 0)));
        assert_eq!(parse_revenue("-$20"), Some(Decimal::new(-20, 0)));
        assert_eq!(parse_revenue("₽ 1 200"), Some(Decimal::new(1200, 0)));
        assert_eq!(parse_revenue("n/a"), None);
    }

    #[test]
    fn temperature_distinguishes_blank_from_invalid() {
        assert_eq!(parse_temperature(" "), Ok(None));
        assert_eq!(parse_temperature("-15.5"), Ok(Some(-15.5)));
        assert_eq!(parse_temperature("-12,5"), Ok(Some(-12.5)));
        assert_eq!(parse_temperature("cold"), Err(InvalidValue));
    }
}
