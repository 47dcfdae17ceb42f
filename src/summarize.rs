//! Key and value abbreviation for flattened records.
//!
//! Flattened XFA keys are long (`xfa:datasets.xfa:data.form1.Page1.
//! PersonalDetails.PlaceBirthCity`). [`summarize`] cuts everything up to the
//! form's root data element and rewrites the remainder through an ordered
//! [`AbbreviationTable`], giving `P1.PD.PlaceBirthCity`.

use crate::error::{Error, Result};
use crate::record::{FlatRecord, Value};
use regex::{NoExpand, Regex};

/// Ordered regex substitutions.
#[derive(Debug, Clone)]
pub struct AbbreviationTable {
    rules: Vec<(Regex, String)>,
}

impl AbbreviationTable {
    /// Compile `(pattern, replacement)` pairs. Replacements are literal.
    pub fn new(pairs: &[(&str, &str)]) -> Result<Self> {
        let rules = pairs
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .map(|re| (re, replacement.to_string()))
                    .map_err(|e| {
                        Error::ConfigLookup(format!("invalid abbreviation pattern '{}': {}", pattern, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Apply every rule in order to `text`.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (pattern, replacement) in &self.rules {
            if pattern.is_match(&out) {
                out = pattern.replace_all(&out, NoExpand(replacement)).into_owned();
            }
        }
        out
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Keep what follows the first occurrence of `cutoff` plus one separator
/// character. Text without `cutoff` is returned as is.
pub fn truncate_after(text: &str, cutoff: &str) -> String {
    match text.find(cutoff) {
        Some(pos) => {
            let mut rest = text[pos + cutoff.len()..].chars();
            rest.next();
            rest.as_str().to_string()
        },
        None => text.to_string(),
    }
}

/// Shorten keys (and optionally text values) of `record`.
///
/// Keys are truncated after `cutoff_term` and then rewritten by `key_rules`.
/// Text values go through the same cutoff and `value_rules` only when value
/// rules are given; other values pass through.
///
/// A rewritten key that collides with one already emitted falls back to its
/// original key, so no field is lost.
pub fn summarize(
    record: FlatRecord,
    cutoff_term: &str,
    key_rules: Option<&AbbreviationTable>,
    value_rules: Option<&AbbreviationTable>,
) -> FlatRecord {
    let mut out = FlatRecord::with_capacity(record.len());

    for (key, value) in record {
        let mut short = truncate_after(&key, cutoff_term);
        if let Some(rules) = key_rules {
            short = rules.apply(&short);
        }

        let value = match (value, value_rules) {
            (Value::Text(text), Some(rules)) => {
                Value::Text(rules.apply(&truncate_after(&text, cutoff_term)))
            },
            (value, _) => value,
        };

        let short = if out.contains_key(&short) {
            let fallback = free_key(&out, key);
            log::warn!("Abbreviated key '{}' already taken, keeping '{}'", short, fallback);
            fallback
        } else {
            short
        };
        out.insert(short, value);
    }

    out
}

fn free_key(record: &FlatRecord, original: String) -> String {
    if !record.contains_key(&original) {
        return original;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}~{}", original, n);
        if !record.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Remove `keys` from `record`, keeping the order of what remains.
///
/// Returns how many keys were present.
pub fn drop_keys<S: AsRef<str>>(record: &mut FlatRecord, keys: &[S]) -> usize {
    let mut removed = 0;
    for key in keys {
        if record.shift_remove(key.as_ref()).is_some() {
            removed += 1;
        }
    }
    removed
}

/// Remove every key containing `needle`, sparing keys that contain `exclude`.
///
/// Returns how many keys were removed.
pub fn drop_keys_containing(record: &mut FlatRecord, needle: &str, exclude: Option<&str>) -> usize {
    let before = record.len();
    record.retain(|key, _| {
        !key.contains(needle) || exclude.map_or(false, |spared| key.contains(spared))
    });
    before - record.len()
}
