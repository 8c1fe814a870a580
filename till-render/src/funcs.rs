//! Template functions
//!
//! `FormatDecimal` and `FormatDate` are the built-ins available to structured
//! ticket layouts. Callers can register extra functions under any name.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::value::kind;

/// Signature of a template function: evaluated arguments in, value or message out
pub type TemplateFn = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

/// Named function table used while parsing and executing a layout
#[derive(Clone, Default)]
pub struct Functions {
    entries: HashMap<String, Arc<TemplateFn>>,
}

impl Functions {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding `FormatDecimal` and `FormatDate`
    pub fn builtin() -> Self {
        let mut functions = Self::new();
        functions.insert("FormatDecimal", format_decimal_fn);
        functions.insert("FormatDate", format_date_fn);
        functions
    }

    /// Register a function, replacing any previous one with the same name
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(f));
        self
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(name, f);
        self
    }

    /// Copy every entry of `other` into this table; `other` wins on conflicts
    pub fn extend(&mut self, other: &Functions) {
        for (name, f) in &other.entries {
            self.entries.insert(name.clone(), Arc::clone(f));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<TemplateFn>> {
        self.entries.get(name)
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}

/// Format a decimal with exactly `precision` fractional digits
///
/// Rounds half away from zero, pads with zeros, and omits the decimal
/// point entirely when `precision` is 0.
///
/// ```
/// use rust_decimal::Decimal;
/// use till_render::format_decimal;
///
/// assert_eq!(format_decimal(Decimal::from(100), 2), "100.00");
/// assert_eq!(format_decimal(Decimal::from(1), 0), "1");
/// ```
pub fn format_decimal(value: Decimal, precision: u32) -> String {
    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", precision as usize, rounded)
}

/// Format a date-time with a reference-time layout (`02/01/2006 15:04`)
///
/// Layout tokens are taken from the reference moment Mon Jan 2 15:04:05 2006
/// UTC-7; text that is not a token is copied as is.
pub fn format_date(date: &DateTime<FixedOffset>, layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() + 8);
    let mut rest = layout;

    'scan: while let Some(c) = rest.chars().next() {
        for (token, piece) in LAYOUT_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                write_piece(&mut out, date, *piece);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Same as [`format_date`] for a naive date-time, read as UTC
pub fn format_naive_date(date: &NaiveDateTime, layout: &str) -> String {
    format_date(&date.and_utc().fixed_offset(), layout)
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    YearLong,
    YearShort,
    MonthLong,
    MonthShort,
    MonthZero,
    Month,
    DayZero,
    DayPadded,
    Day,
    WeekdayLong,
    WeekdayShort,
    Hour24,
    Hour12Zero,
    Hour12,
    MinuteZero,
    Minute,
    SecondZero,
    Second,
    PmUpper,
    PmLower,
    ZoneName,
    IsoColon,
    Iso,
    OffsetColon,
    Offset,
    Micros,
    Millis,
}

// Longer tokens first so "2006" wins over "2" and "January" over "Jan"
const LAYOUT_TOKENS: &[(&str, Piece)] = &[
    ("January", Piece::MonthLong),
    ("Jan", Piece::MonthShort),
    ("Monday", Piece::WeekdayLong),
    ("Mon", Piece::WeekdayShort),
    ("MST", Piece::ZoneName),
    ("2006", Piece::YearLong),
    ("Z07:00", Piece::IsoColon),
    ("Z0700", Piece::Iso),
    ("-07:00", Piece::OffsetColon),
    ("-0700", Piece::Offset),
    (".000000", Piece::Micros),
    (".000", Piece::Millis),
    ("01", Piece::MonthZero),
    ("02", Piece::DayZero),
    ("03", Piece::Hour12Zero),
    ("04", Piece::MinuteZero),
    ("05", Piece::SecondZero),
    ("06", Piece::YearShort),
    ("15", Piece::Hour24),
    ("_2", Piece::DayPadded),
    ("1", Piece::Month),
    ("2", Piece::Day),
    ("3", Piece::Hour12),
    ("4", Piece::Minute),
    ("5", Piece::Second),
    ("PM", Piece::PmUpper),
    ("pm", Piece::PmLower),
];

fn write_piece(out: &mut String, date: &DateTime<FixedOffset>, piece: Piece) {
    let (is_pm, hour12) = date.hour12();
    let offset = date.offset().local_minus_utc();
    let nanos = date.nanosecond().min(999_999_999);

    let text = match piece {
        Piece::YearLong => format!("{:04}", date.year()),
        Piece::YearShort => format!("{:02}", date.year().rem_euclid(100)),
        Piece::MonthLong => date.format("%B").to_string(),
        Piece::MonthShort => date.format("%b").to_string(),
        Piece::MonthZero => format!("{:02}", date.month()),
        Piece::Month => date.month().to_string(),
        Piece::DayZero => format!("{:02}", date.day()),
        Piece::DayPadded => format!("{:>2}", date.day()),
        Piece::Day => date.day().to_string(),
        Piece::WeekdayLong => date.format("%A").to_string(),
        Piece::WeekdayShort => date.format("%a").to_string(),
        Piece::Hour24 => format!("{:02}", date.hour()),
        Piece::Hour12Zero => format!("{hour12:02}"),
        Piece::Hour12 => hour12.to_string(),
        Piece::MinuteZero => format!("{:02}", date.minute()),
        Piece::Minute => date.minute().to_string(),
        Piece::SecondZero => format!("{:02}", date.second()),
        Piece::Second => date.second().to_string(),
        Piece::PmUpper => (if is_pm { "PM" } else { "AM" }).to_string(),
        Piece::PmLower => (if is_pm { "pm" } else { "am" }).to_string(),
        Piece::ZoneName if offset == 0 => "UTC".to_string(),
        Piece::ZoneName => offset_text(offset, false),
        Piece::IsoColon if offset == 0 => "Z".to_string(),
        Piece::IsoColon => offset_text(offset, true),
        Piece::Iso if offset == 0 => "Z".to_string(),
        Piece::Iso => offset_text(offset, false),
        Piece::OffsetColon => offset_text(offset, true),
        Piece::Offset => offset_text(offset, false),
        Piece::Micros => format!(".{:06}", nanos / 1_000),
        Piece::Millis => format!(".{:03}", nanos / 1_000_000),
    };
    out.push_str(&text);
}

fn offset_text(seconds: i32, colon: bool) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    let (hh, mm) = (minutes / 60, minutes % 60);
    if colon {
        format!("{sign}{hh:02}:{mm:02}")
    } else {
        format!("{sign}{hh:02}{mm:02}")
    }
}

// === Template adapters ===

fn format_decimal_fn(args: &[Value]) -> Result<Value, String> {
    let [value, precision] = args else {
        return Err(format!("expected 2 arguments, got {}", args.len()));
    };
    let value = decimal_arg(value)?;
    let precision = match precision {
        Value::Number(n) if n.as_u64().is_some() => n
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| format!("precision {n} out of range"))?,
        Value::Number(n) if n.as_i64().is_some() => {
            return Err(format!("precision must be non-negative, got {n}"));
        }
        other => return Err(format!("precision must be an integer, got {other}")),
    };
    Ok(Value::String(format_decimal(value, precision)))
}

fn format_date_fn(args: &[Value]) -> Result<Value, String> {
    let [date, layout] = args else {
        return Err(format!("expected 2 arguments, got {}", args.len()));
    };
    let date = date_arg(date)?;
    let Value::String(layout) = layout else {
        return Err(format!("layout must be a string, got {}", kind(layout)));
    };
    Ok(Value::String(format_date(&date, layout)))
}

fn decimal_arg(value: &Value) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                return Ok(Decimal::from(int));
            }
            if let Some(int) = n.as_u64() {
                return Ok(Decimal::from(int));
            }
            n.to_string()
        }
        Value::String(s) => s.trim().to_string(),
        other => return Err(format!("expected a number, got {}", kind(other))),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("invalid number {text:?}: {e}"))
}

fn date_arg(value: &Value) -> Result<DateTime<FixedOffset>, String> {
    match value {
        Value::String(s) => parse_date(s.trim()).ok_or_else(|| format!("invalid date {s:?}")),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| format!("invalid unix timestamp {n}")),
        other => Err(format!("expected a date, got {}", kind(other))),
    }
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn reference_date() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-08-12T14:05:09.123456+08:00").unwrap()
    }

    #[test]
    fn test_format_decimal_precision() {
        assert_eq!(format_decimal(dec("100"), 2), "100.00");
        assert_eq!(format_decimal(dec("1"), 0), "1");
        assert_eq!(format_decimal(dec("50"), 1), "50.0");
        assert_eq!(format_decimal(dec("1.0"), 2), "1.00");
        assert_eq!(format_decimal(dec("0.35"), 2), "0.35");
        assert_eq!(format_decimal(dec("-1"), 2), "-1.00");
    }

    #[test]
    fn test_format_decimal_rounds_half_away_from_zero() {
        assert_eq!(format_decimal(dec("2.345"), 2), "2.35");
        assert_eq!(format_decimal(dec("2.344"), 2), "2.34");
        assert_eq!(format_decimal(dec("2.5"), 0), "3");
        assert_eq!(format_decimal(dec("-2.5"), 0), "-3");
    }

    #[test]
    fn test_format_date_layouts() {
        let date = reference_date();
        assert_eq!(format_date(&date, "02/01/2006"), "12/08/2024");
        assert_eq!(format_date(&date, "2006-01-02"), "2024-08-12");
        assert_eq!(format_date(&date, "15:04:05"), "14:05:09");
        assert_eq!(format_date(&date, "3:4:5 PM"), "2:5:9 PM");
        assert_eq!(format_date(&date, "Mon Jan _2"), "Mon Aug 12");
        assert_eq!(format_date(&date, "Monday, 2 January 06"), "Monday, 12 August 24");
        assert_eq!(format_date(&date, "2006-01-02T15:04:05Z07:00"), "2024-08-12T14:05:09+08:00");
        assert_eq!(format_date(&date, "15:04:05.000 -0700"), "14:05:09.123 +0800");
        assert_eq!(format_date(&date, "Date: 02.01.2006"), "Date: 12.08.2024");
    }

    #[test]
    fn test_format_date_utc_zone() {
        let date = DateTime::parse_from_rfc3339("2024-01-05T09:00:00Z").unwrap();
        assert_eq!(format_date(&date, "2006-01-02T15:04:05Z07:00"), "2024-01-05T09:00:00Z");
        assert_eq!(format_date(&date, "_2 MST"), " 5 UTC");
    }

    #[test]
    fn test_format_naive_date() {
        let naive = NaiveDateTime::parse_from_str("2024-08-12T14:30:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        assert_eq!(format_naive_date(&naive, "02/01/2006 15:04"), "12/08/2024 14:30");
    }

    #[test]
    fn test_format_decimal_fn_arguments() {
        assert_eq!(format_decimal_fn(&[json!(5), json!(2)]).unwrap(), json!("5.00"));
        assert_eq!(format_decimal_fn(&[json!("2.50"), json!(1)]).unwrap(), json!("2.5"));
        assert_eq!(format_decimal_fn(&[json!(0.35), json!(2)]).unwrap(), json!("0.35"));
        assert!(format_decimal_fn(&[json!(5), json!(-1)]).is_err());
        assert!(format_decimal_fn(&[json!(5), json!(1.5)]).is_err());
        assert!(format_decimal_fn(&[json!("abc"), json!(2)]).is_err());
        assert!(format_decimal_fn(&[json!(5)]).is_err());
    }

    #[test]
    fn test_format_date_fn_accepts_serialized_dates() {
        let layout = json!("02/01/2006");
        assert_eq!(
            format_date_fn(&[json!("2024-08-12T14:30:00"), layout.clone()]).unwrap(),
            json!("12/08/2024")
        );
        assert_eq!(
            format_date_fn(&[json!("2024-08-12"), layout.clone()]).unwrap(),
            json!("12/08/2024")
        );
        assert_eq!(
            format_date_fn(&[json!(0), layout.clone()]).unwrap(),
            json!("01/01/1970")
        );
        assert!(format_date_fn(&[json!("yesterday"), layout]).is_err());
        assert!(format_date_fn(&[json!("2024-08-12"), json!(5)]).is_err());
    }

    #[test]
    fn test_functions_registry() {
        let mut functions = Functions::builtin();
        assert!(functions.contains("FormatDecimal"));
        assert!(functions.contains("FormatDate"));

        let extra = Functions::new().with("FormatDecimal", |_| Ok(json!("overridden")));
        functions.extend(&extra);
        assert_eq!(functions.len(), 2);

        let f = functions.get("FormatDecimal").unwrap();
        assert_eq!(f(&[]).unwrap(), json!("overridden"));
    }
}
