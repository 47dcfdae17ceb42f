//! Form catalogue: document types, coded enumerations and fill defaults.
//!
//! Only two XFA forms are understood:
//! - **IMM 5257E**, Application for Temporary Resident Visa
//! - **IMM 5645E**, Family Information
//!
//! plus a plain-text label file holding the visa decision.

pub mod tables;

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    /// Any Canadian form, no form-specific handling
    Canada,
    /// IMM 5257E
    Canada5257E,
    /// IMM 5645E
    Canada5645E,
    /// Visa result label file
    CanadaLabel,
}

impl DocType {
    /// Every document type, in code order.
    pub const ALL: [DocType; 4] = [
        DocType::Canada,
        DocType::Canada5257E,
        DocType::Canada5645E,
        DocType::CanadaLabel,
    ];

    /// Dataset name (`CANADA_5257E`).
    pub fn name(&self) -> &'static str {
        match self {
            DocType::Canada => "CANADA",
            DocType::Canada5257E => "CANADA_5257E",
            DocType::Canada5645E => "CANADA_5645E",
            DocType::CanadaLabel => "CANADA_LABEL",
        }
    }

    /// Numeric code.
    pub fn code(&self) -> u8 {
        match self {
            DocType::Canada => 1,
            DocType::Canada5257E => 2,
            DocType::Canada5645E => 3,
            DocType::CanadaLabel => 4,
        }
    }

    /// Substring identifying files of this type in an input directory.
    pub fn file_marker(&self) -> Option<&'static str> {
        match self {
            DocType::Canada5257E => Some("5257"),
            DocType::Canada5645E => Some("5645"),
            DocType::CanadaLabel => Some("label"),
            DocType::Canada => None,
        }
    }

    /// Key prefix cut off every flattened key of this form.
    pub fn cutoff_term(&self) -> Option<&'static str> {
        match self {
            DocType::Canada5257E => Some(CUTOFF_5257E),
            DocType::Canada5645E => Some(CUTOFF_5645E),
            DocType::Canada | DocType::CanadaLabel => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DocType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedDocument(s.to_string()))
    }
}

/// Root data element of the 5257E datasets.
pub const CUTOFF_5257E: &str = "form1";
/// Root data element of the 5645E datasets.
pub const CUTOFF_5645E: &str = "IMM_5645";

/// Marital status codes used by both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarriageStatus {
    /// Common-law partnership
    CommonLaw = 2,
    /// Divorced
    Divorced = 3,
    /// Separated
    Separated = 4,
    /// Married
    Married = 5,
    /// Single
    Single = 7,
    /// Widowed
    Widowed = 8,
    /// Not stated
    Unknown = 9,
}

impl MarriageStatus {
    /// Numeric form code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Look up a status by form code.
    pub fn from_code(code: i64) -> Option<Self> {
        use MarriageStatus::*;
        [CommonLaw, Divorced, Separated, Married, Single, Widowed, Unknown]
            .into_iter()
            .find(|s| s.code() == code)
    }

    /// Dataset label: lowercase with `-` separators (`common-law`).
    pub fn dataset_name(self) -> &'static str {
        match self {
            MarriageStatus::CommonLaw => "common-law",
            MarriageStatus::Divorced => "divorced",
            MarriageStatus::Separated => "separated",
            MarriageStatus::Married => "married",
            MarriageStatus::Single => "single",
            MarriageStatus::Widowed => "widowed",
            MarriageStatus::Unknown => "unknown",
        }
    }
}

/// Residency status codes of the country-of-residence rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidencyStatus {
    /// Citizen
    Citizen = 1,
    /// Visitor
    Visitor = 3,
    /// Anything else
    Other = 6,
}

impl ResidencyStatus {
    /// Numeric form code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Look up a status by form code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ResidencyStatus::Citizen),
            3 => Some(ResidencyStatus::Visitor),
            6 => Some(ResidencyStatus::Other),
            _ => None,
        }
    }
}

/// Values substituted for empty fields.
pub mod fill {
    use super::{MarriageStatus, ResidencyStatus};

    /// Country code that cannot be resolved
    pub const COUNTRY_CODE: &str = "Unknown";
    /// Visa type
    pub const VISA_TYPE: &str = "OTHER";
    /// City of birth
    pub const PLACE_BIRTH_CITY: &str = "OTHER";
    /// Country of birth, residence, education, occupation
    pub const COUNTRY: &str = "IRAN";
    /// Citizenship
    pub const CITIZENSHIP: &str = "IRAN";
    /// Residency status code
    pub const RESIDENCY_STATUS: i64 = ResidencyStatus::Other as i64;
    /// "Other" free-text indicator
    pub const OTHER_DESCRIPTION_INDICATOR: bool = false;
    /// Previous country of residence
    pub const PREVIOUS_COUNTRY: &str = "OTHER";
    /// Country where applying
    pub const COUNTRY_WHERE_APPLYING: &str = "OTHER";
    /// Relationship type of a previous marriage
    pub const MARRIAGE_TYPE: &str = "OTHER";
    /// Passport issuing country
    pub const PASSPORT_COUNTRY: &str = "OTHER";
    /// Native language
    pub const NATIVE_LANG: &str = "IRAN";
    /// Official languages spoken
    pub const LANGUAGES_ABLE: &str = "NEITHER";
    /// National ID issuing country
    pub const ID_COUNTRY: &str = "IRAN";
    /// Purpose of visit code
    pub const PURPOSE_OF_VISIT: i64 = 7;
    /// Contact relationship
    pub const CONTACT_TYPE: &str = "OTHER";
    /// Occupation
    pub const OCCUPATION: &str = "OTHER";
    /// Yes/no indicator
    pub const INDICATOR_FIELD: bool = false;
    /// Visa application type checkboxes of IMM 5645E
    pub const VISA_APPLICATION_TYPE: i64 = 0;
    /// Marital status of a family member
    pub const CHILD_MARRIAGE_STATUS: i64 = MarriageStatus::Unknown as i64;
    /// Relationship of a child or sibling
    pub const CHILD_RELATION: &str = "OTHER";
    /// Visa decision
    pub const VISA_RESULT: i64 = 0;
}
