//! Lexical helpers for the calendar and duration types.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::LexicalError;
use crate::value::Duration;

type Timezone = Option<FixedOffset>;

/// Splits a trailing `Z` or `±HH:MM` timezone off a lexical value.
pub(crate) fn split_timezone(s: &str) -> Result<(&str, Timezone), LexicalError> {
    if let Some(body) = s.strip_suffix('Z') {
        let utc = FixedOffset::east_opt(0).ok_or_else(|| LexicalError::new("invalid timezone"))?;
        return Ok((body, Some(utc)));
    }
    let bytes = s.as_bytes();
    if bytes.len() >= 6 && bytes[bytes.len() - 3] == b':' && matches!(bytes[bytes.len() - 6], b'+' | b'-') {
        let (body, tz) = s.split_at(s.len() - 6);
        return Ok((body, Some(parse_offset(tz)?)));
    }
    Ok((s, None))
}

fn parse_offset(tz: &str) -> Result<FixedOffset, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid timezone '{tz}'"));
    let hours: i32 = digits(&tz[1..3]).ok_or_else(invalid)?;
    let mins: i32 = digits(&tz[4..6]).ok_or_else(invalid)?;
    if hours > 14 || mins > 59 || (hours == 14 && mins != 0) {
        return Err(invalid());
    }
    let total = hours * 3600 + mins * 60;
    let secs = if tz.starts_with('-') { -total } else { total };
    FixedOffset::east_opt(secs).ok_or_else(invalid)
}

pub(crate) fn format_timezone(tz: Timezone) -> String {
    let Some(off) = tz else {
        return String::new();
    };
    let secs = off.local_minus_utc();
    if secs == 0 {
        return "Z".to_owned();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    format!("{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

/// Parses an all-ASCII-digit field.
fn digits<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn year(s: &str) -> Option<i32> {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    if unsigned.len() < 4 || (unsigned.len() > 4 && unsigned.starts_with('0')) {
        return None;
    }
    let y: i32 = digits(unsigned)?;
    Some(if s.starts_with('-') { -y } else { y })
}

fn month(s: &str) -> Option<u8> {
    (s.len() == 2).then(|| digits::<u8>(s)).flatten().filter(|m| (1..=12).contains(m))
}

fn day(s: &str) -> Option<u8> {
    (s.len() == 2).then(|| digits::<u8>(s)).flatten().filter(|d| (1..=31).contains(d))
}

fn max_day_in_month(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub(crate) fn parse_date(s: &str) -> Result<(NaiveDate, Timezone), LexicalError> {
    let (body, tz) = split_timezone(s)?;
    let date = NaiveDate::parse_from_str(body, "%Y-%m-%d")
        .map_err(|err| LexicalError::new(format!("invalid date '{s}': {err}")))?;
    Ok((date, tz))
}

pub(crate) fn parse_time(s: &str) -> Result<(NaiveTime, Timezone), LexicalError> {
    let (body, tz) = split_timezone(s)?;
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|err| LexicalError::new(format!("invalid time '{s}': {err}")))?;
    Ok((time, tz))
}

pub(crate) fn parse_date_time(s: &str) -> Result<(NaiveDateTime, Timezone), LexicalError> {
    let (body, tz) = split_timezone(s)?;
    let value = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|err| LexicalError::new(format!("invalid dateTime '{s}': {err}")))?;
    Ok((value, tz))
}

pub(crate) fn parse_g_year(s: &str) -> Result<(i32, Timezone), LexicalError> {
    let (body, tz) = split_timezone(s)?;
    let y = year(body).ok_or_else(|| LexicalError::new(format!("invalid gYear '{s}'")))?;
    Ok((y, tz))
}

pub(crate) fn parse_g_year_month(s: &str) -> Result<(i32, u8, Timezone), LexicalError> {
    let invalid = || LexicalError::new(format!("invalid gYearMonth '{s}'"));
    let (body, tz) = split_timezone(s)?;
    let (y, m) = body.rsplit_once('-').ok_or_else(invalid)?;
    Ok((year(y).ok_or_else(invalid)?, month(m).ok_or_else(invalid)?, tz))
}

pub(crate) fn parse_g_month_day(s: &str) -> Result<(u8, u8, Timezone), LexicalError> {
    let invalid = || LexicalError::new(format!("invalid gMonthDay '{s}'"));
    let (body, tz) = split_timezone(s)?;
    let rest = body.strip_prefix("--").ok_or_else(invalid)?;
    let (m, d) = rest.split_once('-').ok_or_else(invalid)?;
    let (m, d) = (month(m).ok_or_else(invalid)?, day(d).ok_or_else(invalid)?);
    if d > max_day_in_month(m) {
        return Err(invalid());
    }
    Ok((m, d, tz))
}

pub(crate) fn parse_g_day(s: &str) -> Result<(u8, Timezone), LexicalError> {
    let invalid = || LexicalError::new(format!("invalid gDay '{s}'"));
    let (body, tz) = split_timezone(s)?;
    let d = body.strip_prefix("---").and_then(day).ok_or_else(invalid)?;
    Ok((d, tz))
}

pub(crate) fn parse_g_month(s: &str) -> Result<(u8, Timezone), LexicalError> {
    let invalid = || LexicalError::new(format!("invalid gMonth '{s}'"));
    let (body, tz) = split_timezone(s)?;
    let m = body.strip_prefix("--").and_then(month).ok_or_else(invalid)?;
    Ok((m, tz))
}

/// `-?P(nY)?(nM)?(nD)?(T(nH)?(nM)?(n(.n)?S)?)?` with at least one component.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid duration '{s}'"));
    let negative = s.starts_with('-');
    let body = if negative { &s[1..] } else { s };
    let mut cur = body.strip_prefix('P').ok_or_else(invalid)?;
    let mut out = Duration { negative, ..Duration::default() };
    let mut any = false;
    let mut in_time = false;
    let mut order = 0u8;
    while !cur.is_empty() {
        if let Some(rest) = cur.strip_prefix('T') {
            if in_time || rest.is_empty() {
                return Err(invalid());
            }
            in_time = true;
            order = 3;
            cur = rest;
            continue;
        }
        let end = cur.find(|c: char| !(c.is_ascii_digit() || c == '.')).ok_or_else(invalid)?;
        let (number, rest) = cur.split_at(end);
        let designator = rest.chars().next().ok_or_else(invalid)?;
        cur = &rest[designator.len_utf8()..];
        let slot = match (in_time, designator) {
            (false, 'Y') => 1,
            (false, 'M') => 2,
            (false, 'D') => 3,
            (true, 'H') => 4,
            (true, 'M') => 5,
            (true, 'S') => 6,
            _ => return Err(invalid()),
        };
        if slot <= order {
            return Err(invalid());
        }
        order = slot;
        if slot == 6 {
            if number.starts_with('.') || number.ends_with('.') {
                return Err(invalid());
            }
            out.seconds = Decimal::from_str(number).map_err(|_| invalid())?;
        } else {
            let n: u32 = digits(number).ok_or_else(invalid)?;
            match slot {
                1 => out.years = n,
                2 => out.months = n,
                3 => out.days = n,
                4 => out.hours = n,
                _ => out.minutes = n,
            }
        }
        any = true;
    }
    if any { Ok(out) } else { Err(invalid()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2004-09-12", None)]
    #[case("2004-09-12Z", Some(0))]
    #[case("2004-09-12+02:00", Some(7200))]
    #[case("2004-09-12-05:30", Some(-19800))]
    fn dates_with_and_without_timezone(#[case] input: &str, #[case] offset: Option<i32>) {
        let (date, tz) = parse_date(input).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2004, 9, 12).unwrap());
        assert_eq!(tz.map(|t| t.local_minus_utc()), offset);
    }

    #[rstest]
    #[case("2004-13-01")]
    #[case("2004-09-12+15:00")]
    #[case("12-09-2004")]
    fn invalid_dates_are_rejected(#[case] input: &str) {
        assert!(parse_date(input).is_err());
    }

    #[rstest]
    #[case("P1Y2M3DT4H5M6.5S", (1, 2, 3, 4, 5, "6.5"))]
    #[case("PT0S", (0, 0, 0, 0, 0, "0"))]
    #[case("P3D", (0, 0, 3, 0, 0, "0"))]
    fn durations_decompose(#[case] input: &str, #[case] parts: (u32, u32, u32, u32, u32, &str)) {
        let d = parse_duration(input).unwrap();
        assert_eq!((d.years, d.months, d.days, d.hours, d.minutes), (parts.0, parts.1, parts.2, parts.3, parts.4));
        assert_eq!(d.seconds, Decimal::from_str(parts.5).unwrap());
    }

    #[rstest]
    #[case("P")]
    #[case("PT")]
    #[case("P1H")]
    #[case("P1D2Y")]
    #[case("1Y")]
    fn malformed_durations_are_rejected(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[rstest]
    fn g_types_parse() {
        assert_eq!(parse_g_month("--05").unwrap().0, 5);
        assert_eq!(parse_g_day("---31").unwrap().0, 31);
        assert_eq!(parse_g_month_day("--02-29").unwrap().1, 29);
        assert!(parse_g_month_day("--04-31").is_err());
        assert_eq!(parse_g_year_month("2004-09").unwrap().1, 9);
        assert_eq!(parse_g_year("-0044").unwrap().0, -44);
    }

    #[rstest]
    fn timezone_formatting() {
        assert_eq!(format_timezone(None), "");
        assert_eq!(format_timezone(FixedOffset::east_opt(0)), "Z");
        assert_eq!(format_timezone(FixedOffset::east_opt(-19800)), "-05:30");
    }
}
