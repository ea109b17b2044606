//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::i18n::I18n;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Parse a content API timestamp such as `2021-03-25T19:25:28+0000`
///
/// RFC 3339 and bare `YYYY-MM-DD` dates (taken as UTC midnight) are
/// accepted too.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Format a date with date-fns style tokens, month names from `i18n`
///
/// Supported tokens: `d dd M MM MMM MMMM y yy yyyy H HH m mm s ss`.
/// Text inside single quotes is copied verbatim (`''` is a quote).
///
/// # Examples
/// ```ignore
/// format_date(&date, "dd MMM yyyy", tz, &i18n) // -> "25 mar 2021"
/// ```
pub fn format_date(date: &DateTime<FixedOffset>, pattern: &str, tz: Tz, i18n: &I18n) -> String {
    let local = date.with_timezone(&tz);
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            while let Some(lit) = chars.next() {
                if lit == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push('\'');
                        continue;
                    }
                    break;
                }
                out.push(lit);
            }
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            continue;
        }

        let mut width = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            width += 1;
        }

        match (c, width) {
            ('d', 1) => out.push_str(&local.day().to_string()),
            ('d', _) => out.push_str(&format!("{:02}", local.day())),
            ('M', 1) => out.push_str(&local.month().to_string()),
            ('M', 2) => out.push_str(&format!("{:02}", local.month())),
            ('M', 3) => out.push_str(&i18n.month_short(local.month())),
            ('M', _) => out.push_str(&i18n.month_long(local.month())),
            ('y', 2) => out.push_str(&format!("{:02}", local.year().rem_euclid(100))),
            ('y', 1) => out.push_str(&local.year().to_string()),
            ('y', n) => out.push_str(&format!("{:0width$}", local.year(), width = n)),
            ('H', 1) => out.push_str(&local.hour().to_string()),
            ('H', _) => out.push_str(&format!("{:02}", local.hour())),
            ('m', 1) => out.push_str(&local.minute().to_string()),
            ('m', _) => out.push_str(&format!("{:02}", local.minute())),
            ('s', 1) => out.push_str(&local.second().to_string()),
            ('s', _) => out.push_str(&format!("{:02}", local.second())),
            (other, n) => out.extend(std::iter::repeat(other).take(n)),
        }
    }

    out
}

/// Parse then format a timestamp; `None` when it cannot be parsed
pub fn format_timestamp(value: &str, pattern: &str, tz: Tz, i18n: &I18n) -> Option<String> {
    parse_timestamp(value).map(|dt| format_date(&dt, pattern, tz, i18n))
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let dt = parse_timestamp("2021-03-25T19:25:28+0000").unwrap();
        assert_eq!(date_xml(&dt), "2021-03-25T19:25:28+00:00");

        let dt = parse_timestamp("2021-03-25T19:25:28-03:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -3 * 3600);

        let dt = parse_timestamp("2021-03-25").unwrap();
        assert_eq!(date_xml(&dt), "2021-03-25T00:00:00+00:00");

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_timestamp_orders() {
        let a = parse_timestamp("2021-03-25T19:25:28+0000").unwrap();
        let b = parse_timestamp("2021-03-25T17:25:28-0300").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_format_listing_and_post_dates() {
        let i18n = I18n::new("pt-BR");
        let dt = parse_timestamp("2021-03-05T19:25:28+0000").unwrap();
        let tz = chrono_tz::America::Sao_Paulo;
        assert_eq!(format_date(&dt, "dd MMM yyyy", tz, &i18n), "05 mar 2021");
        assert_eq!(format_date(&dt, "d MMM y", tz, &i18n), "5 mar 2021");
        assert_eq!(format_date(&dt, "d 'de' MMMM", tz, &i18n), "5 de março");
    }

    #[test]
    fn test_format_converts_timezone() {
        let i18n = I18n::new("pt-BR");
        let dt = parse_timestamp("2021-01-01T01:30:00+0000").unwrap();
        assert_eq!(
            format_date(&dt, "dd MMM yyyy", chrono_tz::America::Sao_Paulo, &i18n),
            "31 dez 2020"
        );
        assert_eq!(
            format_date(&dt, "dd MMM yyyy", chrono_tz::UTC, &i18n),
            "01 jan 2021"
        );
    }

    #[test]
    fn test_format_quoted_literals() {
        let i18n = I18n::new("pt-BR");
        let dt = parse_timestamp("2021-03-19T18:49:00+0000").unwrap();
        assert_eq!(
            format_date(&dt, "dd MMM yyyy, 'às' HH:mm", chrono_tz::America::Sao_Paulo, &i18n),
            "19 mar 2021, às 15:49"
        );
        assert_eq!(format_date(&dt, "'o''clock' H", chrono_tz::UTC, &i18n), "o'clock 18");
    }

    #[test]
    fn test_format_timestamp_unparseable() {
        let i18n = I18n::new("en");
        assert_eq!(format_timestamp("nope", "d", chrono_tz::UTC, &i18n), None);
        assert_eq!(
            format_timestamp("2021-03-19", "dd MMM yy", chrono_tz::UTC, &i18n).as_deref(),
            Some("19 Mar 21")
        );
    }
}
