//! Field transform engine.
//!
//! Each form is normalized by an ordered chain of [`Step`]s:
//!
//! - [`Step::Field`] coerces one field and fills it when empty
//! - [`Step::Matching`] applies one operation to every key containing a needle
//! - [`Step::Repeated`] walks numbered row groups (previous residences,
//!   occupations, children, siblings) and detects ghost rows
//! - [`Step::Duration`] folds a pair of dates into a number of days
//!
//! Order matters: fills may reference fields already transformed by earlier
//! steps, and durations must run after the dates they read.
//!
//! # Example
//!
//! ```ignore
//! use canada_xfa::transform::{run_steps, Coercion, FillPolicy, Step, TransformContext};
//!
//! let steps = vec![
//!     Step::flag("P1.PD.PCRIndicator", "Y"),
//!     Step::cast("P1.PD.CurrCOR.Row2.Status", Coercion::ToInt, FillPolicy::literal(6)),
//! ];
//! let record = run_steps(record, &steps, &TransformContext::default())?;
//! ```

pub mod canada_5257e;
pub mod canada_5645e;
pub mod dates;
pub mod label;

use crate::error::{Error, Result};
use crate::forms::fill;
use crate::record::{FlatRecord, Value};
use crate::summarize::{drop_keys, drop_keys_containing};
use chrono::NaiveDateTime;
use dates::{coerce_date, shift_years, DurationRule};

/// Target type of a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Render as text
    ToString,
    /// Parse a decimal integer
    ToInt,
    /// Truthiness: non-empty text, non-zero number
    ToBool,
    /// Parse (and if needed repair) a date
    ToDate,
}

/// Replacement for an empty field.
#[derive(Debug, Clone, PartialEq)]
pub enum FillPolicy {
    /// Leave it empty
    Skip,
    /// Constant value
    Literal(Value),
    /// Current value of another field
    FieldRef(String),
    /// Date held by another field, shifted by whole years
    FieldRefShiftedYears {
        /// Referenced field
        key: String,
        /// Signed number of years
        years: i32,
    },
    /// Reference date supplied by the caller
    ReferenceDate,
}

impl FillPolicy {
    /// Constant fill.
    pub fn literal(value: impl Into<Value>) -> Self {
        FillPolicy::Literal(value.into())
    }

    /// Fill from another field.
    pub fn field(key: impl Into<String>) -> Self {
        FillPolicy::FieldRef(key.into())
    }
}

/// Operation applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Boolean recode: true when the value equals `truthy`
    Flag {
        /// Sentinel meaning "yes"
        truthy: &'static str,
    },
    /// Type coercion with a fill for empty values
    Cast {
        /// Target type
        to: Coercion,
        /// Fill for empty values
        fill: FillPolicy,
    },
}

/// An operation bound to a key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Flattened key
    pub key: String,
    /// Operation
    pub op: FieldOp,
}

impl FieldRule {
    /// Boolean recode rule.
    pub fn flag(key: impl Into<String>, truthy: &'static str) -> Self {
        Self {
            key: key.into(),
            op: FieldOp::Flag { truthy },
        }
    }

    /// Cast rule.
    pub fn cast(key: impl Into<String>, to: Coercion, fill: FillPolicy) -> Self {
        Self {
            key: key.into(),
            op: FieldOp::Cast { to, fill },
        }
    }
}

/// Ghost-row detection for a family member slot.
///
/// A slot is a ghost when it carries nothing but defaults: unknown marital
/// status, `OTHER` relation, no date of birth, not accompanying. Its date of
/// birth is then filled so that the derived age is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostCheck {
    /// Marital status key
    pub marital_status: String,
    /// Relation key
    pub relation: String,
    /// Date of birth key
    pub date_of_birth: String,
    /// Accompanying flag key
    pub accompanying: String,
    /// Fill used for a ghost's date of birth
    pub fill: FillPolicy,
}

impl GhostCheck {
    /// True when every field of the slot holds its default.
    pub fn is_ghost(&self, record: &FlatRecord) -> bool {
        let status = record.get(&self.marital_status) == Some(&Value::Int(fill::CHILD_MARRIAGE_STATUS));
        let relation = record.get(&self.relation).and_then(Value::as_str) == Some(fill::CHILD_RELATION);
        let no_birth_date = record.get(&self.date_of_birth).map_or(true, Value::is_null);
        let alone = record.get(&self.accompanying) == Some(&Value::Bool(false));
        status && relation && no_birth_date && alone
    }
}

/// Rules for one row of a repeated group.
#[derive(Debug, Clone, Default)]
pub struct RepeatedItem {
    /// Field rules, applied first
    pub rules: Vec<FieldRule>,
    /// Ghost detection, applied after the rules
    pub ghost: Option<GhostCheck>,
    /// Durations, applied last
    pub durations: Vec<DurationRule>,
}

/// A group of numbered rows discovered from the record.
#[derive(Debug, Clone)]
pub struct RepeatedBlock {
    /// Substring shared by every key of the group
    pub prefix: &'static str,
    /// Keys per row
    pub fields_per_item: usize,
    /// Index of the first row
    pub first_index: usize,
    /// Rules for the row with a given index
    pub item: fn(usize) -> RepeatedItem,
}

impl RepeatedBlock {
    /// Number of rows present in `record`.
    pub fn count(&self, record: &FlatRecord) -> usize {
        if self.fields_per_item == 0 {
            return 0;
        }
        record.keys().filter(|k| k.contains(self.prefix)).count() / self.fields_per_item
    }
}

/// One step of a transform chain.
#[derive(Debug, Clone)]
pub enum Step {
    /// Remove the listed keys
    DropKeys(&'static [&'static str]),
    /// Remove every key containing the needle
    DropContaining(&'static str),
    /// Single field operation
    Field(FieldRule),
    /// Same operation on every key containing `needle`
    Matching {
        /// Substring selecting the keys
        needle: &'static str,
        /// Operation
        op: FieldOp,
    },
    /// Repeated row group
    Repeated(RepeatedBlock),
    /// Derived duration
    Duration(DurationRule),
}

impl Step {
    /// Boolean recode step.
    pub fn flag(key: impl Into<String>, truthy: &'static str) -> Self {
        Step::Field(FieldRule::flag(key, truthy))
    }

    /// Cast step.
    pub fn cast(key: impl Into<String>, to: Coercion, fill: FillPolicy) -> Self {
        Step::Field(FieldRule::cast(key, to, fill))
    }
}

/// State shared by every step of a chain.
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    /// Date standing in for "today" (the form's issue date)
    pub reference_date: Option<NaiveDateTime>,
}

impl TransformContext {
    /// Context carrying a reference date.
    pub fn with_reference_date(reference_date: Option<NaiveDateTime>) -> Self {
        Self { reference_date }
    }
}

/// Convert `value` to the `to` type. `Null` stays `Null`.
pub fn coerce(field: &str, value: Value, to: Coercion) -> Result<Value> {
    match (to, value) {
        (_, Value::Null) => Ok(Value::Null),

        (Coercion::ToString, Value::Text(s)) => Ok(Value::Text(s)),
        (Coercion::ToString, other) => Ok(Value::Text(other.to_string())),

        (Coercion::ToInt, Value::Int(i)) => Ok(Value::Int(i)),
        (Coercion::ToInt, Value::Bool(b)) => Ok(Value::Int(i64::from(b))),
        (Coercion::ToInt, Value::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::coercion(field, &s, "expected an integer")),
        (Coercion::ToInt, other) => Err(Error::coercion(field, &other, "expected an integer")),

        (Coercion::ToBool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (Coercion::ToBool, Value::Int(i)) => Ok(Value::Bool(i != 0)),
        (Coercion::ToBool, Value::Text(s)) => Ok(Value::Bool(!s.is_empty())),
        (Coercion::ToBool, Value::Date(_)) => Ok(Value::Bool(true)),

        (Coercion::ToDate, Value::Date(d)) => Ok(Value::Date(d)),
        (Coercion::ToDate, Value::Text(s)) => coerce_date(field, &s).map(Value::Date),
        (Coercion::ToDate, other) => Err(Error::coercion(field, &other, "expected a date")),
    }
}

fn resolve_fill(fill: &FillPolicy, record: &FlatRecord, ctx: &TransformContext) -> Value {
    match fill {
        FillPolicy::Skip => Value::Null,
        FillPolicy::Literal(value) => value.clone(),
        FillPolicy::FieldRef(key) => record.get(key).cloned().unwrap_or(Value::Null),
        FillPolicy::FieldRefShiftedYears { key, years } => record
            .get(key)
            .and_then(Value::as_date)
            .and_then(|d| shift_years(d, *years))
            .map(Value::Date)
            .unwrap_or(Value::Null),
        FillPolicy::ReferenceDate => ctx.reference_date.map(Value::Date).unwrap_or(Value::Null),
    }
}

/// Apply `op` to `key`. Absent keys are skipped.
pub fn apply_field(
    record: &mut FlatRecord,
    key: &str,
    op: &FieldOp,
    ctx: &TransformContext,
) -> Result<()> {
    let current = match record.get(key) {
        Some(value) => value.clone(),
        None => {
            log::debug!("Field '{}' not in record, skipped", key);
            return Ok(());
        },
    };

    let updated = match op {
        FieldOp::Flag { truthy } => Value::Bool(match &current {
            Value::Text(s) => s == truthy,
            Value::Bool(b) => *b,
            Value::Null => false,
            other => other.to_string() == *truthy,
        }),
        FieldOp::Cast { to, fill } => {
            let source = if current.is_null() {
                let filled = resolve_fill(fill, record, ctx);
                if !filled.is_null() {
                    log::debug!("Field '{}' empty, filled with '{}'", key, filled);
                }
                filled
            } else {
                current
            };
            coerce(key, source, *to)?
        },
    };

    if let Some(slot) = record.get_mut(key) {
        *slot = updated;
    }
    Ok(())
}

fn apply_item(record: &mut FlatRecord, item: &RepeatedItem, ctx: &TransformContext) -> Result<()> {
    for rule in &item.rules {
        apply_field(record, &rule.key, &rule.op, ctx)?;
    }
    if let Some(ghost) = &item.ghost {
        if ghost.is_ghost(record) {
            log::debug!("Slot of '{}' is empty, filling date of birth", ghost.date_of_birth);
            let op = FieldOp::Cast {
                to: Coercion::ToDate,
                fill: ghost.fill.clone(),
            };
            apply_field(record, &ghost.date_of_birth, &op, ctx)?;
        }
    }
    Ok(())
}

/// Run `steps` over `record` in order.
pub fn run_steps(mut record: FlatRecord, steps: &[Step], ctx: &TransformContext) -> Result<FlatRecord> {
    for step in steps {
        match step {
            Step::DropKeys(keys) => {
                let removed = drop_keys(&mut record, keys);
                log::debug!("Dropped {} of {} junk keys", removed, keys.len());
            },
            Step::DropContaining(needle) => {
                let removed = drop_keys_containing(&mut record, needle, None);
                log::debug!("Dropped {} keys containing '{}'", removed, needle);
            },
            Step::Field(rule) => apply_field(&mut record, &rule.key, &rule.op, ctx)?,
            Step::Matching { needle, op } => {
                let keys: Vec<String> = record.keys().filter(|k| k.contains(needle)).cloned().collect();
                for key in keys {
                    apply_field(&mut record, &key, op, ctx)?;
                }
            },
            Step::Repeated(block) => {
                let count = block.count(&record);
                log::debug!("Found {} rows under '{}'", count, block.prefix);
                for index in block.first_index..block.first_index + count {
                    let item = (block.item)(index);
                    apply_item(&mut record, &item, ctx)?;
                    for duration in &item.durations {
                        record = dates::aggregate_datetime(record, duration)?;
                    }
                }
            },
            Step::Duration(rule) => {
                record = dates::aggregate_datetime(record, rule)?;
            },
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> FlatRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce("k", Value::Text(" 01 ".into()), Coercion::ToInt).unwrap(), Value::Int(1));
        assert_eq!(coerce("k", Value::Bool(true), Coercion::ToInt).unwrap(), Value::Int(1));
        let err = coerce("P3.DOV.PrpsRow1.Funds.Funds", Value::Text("lots".into()), Coercion::ToInt)
            .unwrap_err();
        match err {
            Error::FieldCoercion { field, value, .. } => {
                assert_eq!(field, "P3.DOV.PrpsRow1.Funds.Funds");
                assert_eq!(value, "lots");
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_coerce_bool_and_string() {
        assert_eq!(coerce("k", Value::Text("N".into()), Coercion::ToBool).unwrap(), Value::Bool(true));
        assert_eq!(coerce("k", Value::Text(String::new()), Coercion::ToBool).unwrap(), Value::Bool(false));
        assert_eq!(coerce("k", Value::Int(7), Coercion::ToString).unwrap(), Value::Text("7".into()));
        assert_eq!(coerce("k", Value::Null, Coercion::ToDate).unwrap(), Value::Null);
    }

    #[test]
    fn test_flag_recode() {
        let mut r = record(&[
            ("yes", Value::Text("Y".into())),
            ("no", Value::Text("N".into())),
            ("empty", Value::Null),
        ]);
        let ctx = TransformContext::default();
        for key in ["yes", "no", "empty", "absent"] {
            apply_field(&mut r, key, &FieldOp::Flag { truthy: "Y" }, &ctx).unwrap();
        }
        assert_eq!(r["yes"], Value::Bool(true));
        assert_eq!(r["no"], Value::Bool(false));
        assert_eq!(r["empty"], Value::Bool(false));
        assert!(!r.contains_key("absent"));
    }

    #[test]
    fn test_fill_policies() {
        let mut r = record(&[
            ("cert", Value::Date(date(2021, 6, 15))),
            ("lit", Value::Null),
            ("ref", Value::Null),
            ("shifted", Value::Null),
            ("reference", Value::Null),
            ("skip", Value::Null),
        ]);
        let ctx = TransformContext::with_reference_date(Some(date(2020, 1, 1)));
        let steps = vec![
            Step::cast("lit", Coercion::ToInt, FillPolicy::literal(6)),
            Step::cast("ref", Coercion::ToDate, FillPolicy::field("cert")),
            Step::cast(
                "shifted",
                Coercion::ToDate,
                FillPolicy::FieldRefShiftedYears {
                    key: "cert".into(),
                    years: -1,
                },
            ),
            Step::cast("reference", Coercion::ToDate, FillPolicy::ReferenceDate),
            Step::cast("skip", Coercion::ToDate, FillPolicy::Skip),
        ];
        r = run_steps(r, &steps, &ctx).unwrap();
        assert_eq!(r["lit"], Value::Int(6));
        assert_eq!(r["ref"], Value::Date(date(2021, 6, 15)));
        assert_eq!(r["shifted"], Value::Date(date(2020, 6, 15)));
        assert_eq!(r["reference"], Value::Date(date(2020, 1, 1)));
        assert!(r["skip"].is_null());
    }

    #[test]
    fn test_reference_fill_without_reference_date() {
        let r = record(&[("d", Value::Null)]);
        let steps = vec![Step::cast("d", Coercion::ToDate, FillPolicy::ReferenceDate)];
        let r = run_steps(r, &steps, &TransformContext::default()).unwrap();
        assert!(r["d"].is_null());
    }

    #[test]
    fn test_matching_and_drop_steps() {
        let r = record(&[
            ("p1.Subform1.Visitor", Value::Text("1".into())),
            ("p1.Subform1.Student", Value::Null),
            ("p1.SecA.Sps.SpsNo", Value::Text("1".into())),
        ]);
        let steps = vec![
            Step::Matching {
                needle: "p1.Subform1",
                op: FieldOp::Cast {
                    to: Coercion::ToInt,
                    fill: FillPolicy::literal(0),
                },
            },
            Step::DropContaining("No"),
        ];
        let r = run_steps(r, &steps, &TransformContext::default()).unwrap();
        assert_eq!(r["p1.Subform1.Visitor"], Value::Int(1));
        assert_eq!(r["p1.Subform1.Student"], Value::Int(0));
        assert_eq!(r.len(), 2);
    }

    fn test_row(index: usize) -> RepeatedItem {
        RepeatedItem {
            rules: vec![FieldRule::cast(
                format!("Row{}.Status", index),
                Coercion::ToInt,
                FillPolicy::literal(6),
            )],
            ghost: None,
            durations: vec![DurationRule::period(format!("Row{}", index))],
        }
    }

    #[test]
    fn test_repeated_block_counts_rows() {
        let r = record(&[
            ("Row2.Status", Value::Null),
            ("Row2.FromDate", Value::Date(date(2010, 1, 1))),
            ("Row2.ToDate", Value::Date(date(2010, 1, 2))),
            ("Row3.Status", Value::Text("1".into())),
            ("Row3.FromDate", Value::Null),
            ("Row3.ToDate", Value::Null),
        ]);
        let block = RepeatedBlock {
            prefix: "Row",
            fields_per_item: 3,
            first_index: 2,
            item: test_row,
        };
        assert_eq!(block.count(&r), 2);
        let r = run_steps(r, &[Step::Repeated(block)], &TransformContext::default()).unwrap();
        assert_eq!(r["Row2.Status"], Value::Int(6));
        assert_eq!(r["Row2.Period"], Value::Int(1));
        assert_eq!(r["Row3.Status"], Value::Int(1));
        assert!(!r.contains_key("Row3.Period"));
    }

    #[test]
    fn test_ghost_check() {
        let ghost = GhostCheck {
            marital_status: "m".into(),
            relation: "r".into(),
            date_of_birth: "d".into(),
            accompanying: "a".into(),
            fill: FillPolicy::ReferenceDate,
        };
        let mut r = record(&[
            ("m", Value::Int(9)),
            ("r", Value::Text("OTHER".into())),
            ("d", Value::Null),
            ("a", Value::Bool(false)),
        ]);
        assert!(ghost.is_ghost(&r));
        r.insert("a".into(), Value::Bool(true));
        assert!(!ghost.is_ghost(&r));
        r.insert("a".into(), Value::Bool(false));
        r.insert("r".into(), Value::Text("SON".into()));
        assert!(!ghost.is_ghost(&r));
    }
}
