//! Date parsing, repair and derived durations.

use crate::error::{Error, Result};
use crate::record::{FlatRecord, Value};
use chrono::{Months, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref YEAR_ONLY: Regex = Regex::new(r"^(\d{4})$").unwrap();
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{4})[-/.](\d{1,2})$").unwrap();
    static ref COMPACT_MMDDYYYY: Regex = Regex::new(r"^\d{8}$").unwrap();
}

const DATE_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

/// Parse a form date. Missing month or day default to 1.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for layout in DATE_TIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return midnight(date);
        }
    }
    if let Some(caps) = YEAR_MONTH.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1).and_then(midnight);
    }
    if let Some(caps) = YEAR_ONLY.captures(text) {
        let year = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).and_then(midnight);
    }
    None
}

/// Repair common malformed form dates.
///
/// - eight digits are read as `MMDDYYYY` and become `YYYY-MM-DD`
/// - a February 30th has its trailing `30` replaced with `28`
pub fn standardize_date(raw: &str) -> String {
    let mut value = raw.trim().to_string();
    if COMPACT_MMDDYYYY.is_match(&value) {
        value = format!("{}-{}-{}", &value[4..8], &value[0..2], &value[2..4]);
    }
    if value.get(5..7) == Some("02") && value.get(8..10) == Some("30") {
        if let Some(pos) = value.rfind("30") {
            value.replace_range(pos..pos + 2, "28");
        }
    }
    value
}

/// Parse `raw`, falling back to [`standardize_date`] when it does not parse.
pub fn coerce_date(field: &str, raw: &str) -> Result<NaiveDateTime> {
    if let Some(dt) = parse_date(raw) {
        return Ok(dt);
    }
    let repaired = standardize_date(raw);
    log::debug!("Date '{}' of '{}' standardized to '{}'", raw, field, repaired);
    parse_date(&repaired).ok_or_else(|| Error::coercion(field, raw, "expected a date"))
}

/// Shift a date by whole years; February 29th clamps to the 28th.
pub fn shift_years(date: NaiveDateTime, years: i32) -> Option<NaiveDateTime> {
    let months = Months::new(years.unsigned_abs() * 12);
    if years < 0 {
        date.checked_sub_months(months)
    } else {
        date.checked_add_months(months)
    }
}

/// Whole days from `from` to `to`.
pub fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_days()
}

/// What a duration does when an endpoint is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfNan {
    /// Leave the record untouched
    Skip,
    /// Fail with a coercion error
    Fail,
}

/// One end of a one-sided duration.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// Date held by another field
    Field(String),
    /// Fixed date
    Fixed(NaiveDateTime),
}

/// Which endpoints a duration reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    /// `base.From…` to `base.To…`
    Both,
    /// `anchor` to the `base` field
    Left(Anchor),
    /// The `base` field to `anchor`
    Right(Anchor),
}

/// A derived duration: `(to - from)` in days stored as `base.new_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationRule {
    /// Key prefix (two-sided) or exact key (one-sided)
    pub base: String,
    /// Last segment of the derived key
    pub new_name: String,
    /// Endpoints
    pub span: Span,
    /// Missing endpoint handling
    pub if_nan: IfNan,
}

impl DurationRule {
    /// Period between `base.From…` and `base.To…`.
    pub fn period(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            new_name: "Period".to_string(),
            span: Span::Both,
            if_nan: IfNan::Skip,
        }
    }

    /// Time elapsed from the `base` field up to the date in `until`.
    pub fn elapsed_until(base: impl Into<String>, until: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            new_name: "Period".to_string(),
            span: Span::Right(Anchor::Field(until.into())),
            if_nan: IfNan::Skip,
        }
    }

    /// Time remaining from the date in `since` up to the `base` field.
    pub fn remaining_since(base: impl Into<String>, since: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            new_name: "Remaining".to_string(),
            span: Span::Left(Anchor::Field(since.into())),
            if_nan: IfNan::Skip,
        }
    }

    /// Replace the missing-endpoint policy.
    pub fn with_if_nan(mut self, if_nan: IfNan) -> Self {
        self.if_nan = if_nan;
        self
    }

    /// Key the duration is stored under.
    pub fn derived_key(&self) -> String {
        format!("{}.{}", self.base, self.new_name)
    }
}

/// Date held by `key`. Unparseable values count as missing under
/// [`IfNan::Skip`].
fn endpoint(record: &FlatRecord, key: &str, if_nan: IfNan) -> Result<Option<NaiveDateTime>> {
    let parsed = match record.get(key) {
        Some(Value::Date(d)) => Ok(*d),
        Some(Value::Text(s)) => coerce_date(key, s),
        Some(Value::Null) | None => return Ok(None),
        Some(other) => Err(Error::coercion(key, other, "expected a date")),
    };
    match (parsed, if_nan) {
        (Ok(date), _) => Ok(Some(date)),
        (Err(e), IfNan::Skip) => {
            log::debug!("Endpoint '{}' treated as missing: {}", key, e);
            Ok(None)
        },
        (Err(e), IfNan::Fail) => Err(e),
    }
}

fn anchor_date(record: &FlatRecord, anchor: &Anchor, if_nan: IfNan) -> Result<Option<NaiveDateTime>> {
    match anchor {
        Anchor::Field(key) => endpoint(record, key, if_nan),
        Anchor::Fixed(date) => Ok(Some(*date)),
    }
}

/// Replace a pair of dates with the number of days between them.
///
/// The source field keys are removed and the duration is appended under
/// [`DurationRule::derived_key`]. Anchor fields are kept.
pub fn aggregate_datetime(mut record: FlatRecord, rule: &DurationRule) -> Result<FlatRecord> {
    let (from, to, sources) = match &rule.span {
        Span::Both => {
            let pattern = Regex::new(&format!(r"^{}\.(From|To).+", regex::escape(&rule.base)))
                .map_err(|e| Error::ConfigLookup(format!("duration pattern: {}", e)))?;
            let matching: Vec<String> =
                record.keys().filter(|k| pattern.is_match(k)).cloned().collect();
            let from_key = matching.iter().find(|k| k[rule.base.len() + 1..].starts_with("From"));
            let to_key = matching.iter().find(|k| k[rule.base.len() + 1..].starts_with("To"));
            let (from_key, to_key) = match (from_key, to_key) {
                (Some(f), Some(t)) => (f.clone(), t.clone()),
                _ => {
                    log::debug!("No From/To pair under '{}'", rule.base);
                    return Ok(record);
                },
            };
            (
                endpoint(&record, &from_key, rule.if_nan)?,
                endpoint(&record, &to_key, rule.if_nan)?,
                vec![from_key, to_key],
            )
        },
        Span::Left(anchor) => {
            if !record.contains_key(&rule.base) {
                return Ok(record);
            }
            (
                anchor_date(&record, anchor, rule.if_nan)?,
                endpoint(&record, &rule.base, rule.if_nan)?,
                vec![rule.base.clone()],
            )
        },
        Span::Right(anchor) => {
            if !record.contains_key(&rule.base) {
                return Ok(record);
            }
            (
                endpoint(&record, &rule.base, rule.if_nan)?,
                anchor_date(&record, anchor, rule.if_nan)?,
                vec![rule.base.clone()],
            )
        },
    };

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => match rule.if_nan {
            IfNan::Skip => {
                log::debug!("Duration '{}' skipped, missing or unparseable endpoint", rule.derived_key());
                return Ok(record);
            },
            IfNan::Fail => {
                return Err(Error::coercion(
                    rule.derived_key(),
                    "",
                    "duration endpoint is missing",
                ))
            },
        },
    };

    record.insert(rule.derived_key(), Value::Int(days_between(from, to)));
    for key in &sources {
        record.shift_remove(key);
    }
    Ok(record)
}
