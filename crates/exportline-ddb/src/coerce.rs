//! Typed projection helpers applied by the classifier
//!
//! Attributes are loosely typed in the source table: a flag may be stored as
//! `BOOL`, `N` or `S`, and timestamps show up in several textual shapes.
//! These helpers normalise them; none of them fail.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::AttrValue;

/// Naive date-time layouts tried after RFC 3339. `%.f` makes the fraction optional.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Text view of an attribute: strings as-is, numbers as their decimal text.
pub fn string(value: Option<&AttrValue>) -> Option<String> {
    match value? {
        AttrValue::S(s) => Some(s.clone()),
        AttrValue::N(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Exact decimal from an `N`, or from an `S` holding a decimal literal.
pub fn decimal(value: Option<&AttrValue>) -> Option<BigDecimal> {
    match value? {
        AttrValue::N(n) => Some(n.clone()),
        AttrValue::S(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Flag coercion; anything absent or unrecognised is `false`.
pub fn flag(value: Option<&AttrValue>) -> bool {
    match value {
        Some(AttrValue::Bool(b)) => *b,
        Some(AttrValue::N(n)) => *n != BigDecimal::from(0),
        Some(AttrValue::S(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    }
}

/// Timestamp from a string attribute, normalised to UTC.
pub fn timestamp(value: Option<&AttrValue>) -> Option<DateTime<Utc>> {
    parse_timestamp(value?.as_str()?)
}

/// Parse RFC 3339, a naive date-time (taken as UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn s(v: &str) -> AttrValue {
        AttrValue::S(v.to_string())
    }

    fn n(v: &str) -> AttrValue {
        AttrValue::N(BigDecimal::from_str(v).unwrap())
    }

    #[test]
    fn string_from_number_uses_decimal_text() {
        assert_eq!(string(Some(&s("x"))).as_deref(), Some("x"));
        assert_eq!(string(Some(&n("42"))).as_deref(), Some("42"));
        assert_eq!(string(Some(&AttrValue::Bool(true))), None);
        assert_eq!(string(None), None);
    }

    #[test]
    fn decimal_accepts_numeric_strings() {
        assert_eq!(decimal(Some(&n("19.99"))), Some(BigDecimal::from_str("19.99").unwrap()));
        assert_eq!(decimal(Some(&s(" 5.10 "))), Some(BigDecimal::from_str("5.1").unwrap()));
        assert_eq!(decimal(Some(&s("abc"))), None);
        assert_eq!(decimal(Some(&AttrValue::Null)), None);
    }

    #[test]
    fn flag_coercion() {
        assert!(flag(Some(&AttrValue::Bool(true))));
        assert!(!flag(Some(&AttrValue::Bool(false))));
        assert!(!flag(None));
        assert!(!flag(Some(&AttrValue::Null)));
        assert!(flag(Some(&n("1"))));
        assert!(!flag(Some(&n("0"))));
        assert!(flag(Some(&s("TRUE"))));
        assert!(flag(Some(&s("1"))));
        assert!(!flag(Some(&s("yes"))));
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T11:30:00-03:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn timestamp_keeps_fraction() {
        let ts = parse_timestamp("2024-03-05T14:30:00.123456").unwrap();
        assert_eq!(ts.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn unparsable_timestamp_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(timestamp(Some(&n("1700000000"))), None);
    }
}
