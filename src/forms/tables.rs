//! Abbreviation and drop tables for the supported forms.
//!
//! Abbreviation rules are regex substitutions applied in table order to the
//! running key, so later rules see the output of earlier ones
//! (`Details.VisaChoice3` only exists once `BackgroundInfo` became `BGI`).

use super::DocType;
use crate::error::{Error, Result};
use crate::summarize::AbbreviationTable;
use lazy_static::lazy_static;

/// Key abbreviations for IMM 5257E.
pub const KEY_ABBREVIATIONS_5257E: &[(&str, &str)] = &[
    ("Page", "P"),
    ("PersonalDetails", "PD"),
    ("CountryWhereApplying", "CWA"),
    ("MaritalStatus", "MS"),
    ("Section", "Sec"),
    ("ContactInformation", "CI"),
    ("DetailsOfVisit", "DOV"),
    ("Education", "Edu"),
    ("PageWrapper", "PW"),
    ("Occupation", "Occ"),
    ("BackgroundInfo", "BGI"),
    ("Current", "Curr"),
    ("Previous", "Prev"),
    ("Marriage", "Marr"),
    ("Married", "Marr"),
    ("Previously", "Prev"),
    ("Passport", "Psprt"),
    ("Language", "Lang"),
    ("Address", "Addr"),
    ("contact", "cntct"),
    ("Contact", "cntct"),
    ("Resident", "Resi"),
    ("Phone", "Phn"),
    ("Number", "Num"),
    ("Purpose", "Prps"),
    ("HowLongStay", "HLS"),
    ("Signature", "Sign"),
    (r"GovPosition\.Choice", "witnessIllTreat"),
    (r"Occ\.Choice", "politicViol"),
    (r"BGI3\.Choice", "criminalRec"),
    (r"Details\.VisaChoice3", "PrevApply"),
    (r"BGI2\.VisaChoice2", "refuseDeport"),
    (r"BGI2\.VisaChoice1", "noAuthStay"),
    ("backgroundInfoCalc", "otherThanMedic"),
];

/// Key abbreviations for IMM 5645E.
pub const KEY_ABBREVIATIONS_5645E: &[(&str, &str)] = &[
    ("page", "p"),
    ("Applicant", "App"),
    ("Mother", "Mo"),
    ("Father", "Fa"),
    ("Section", "Sec"),
    ("Spouse", "Sps"),
    ("Child", "Chd"),
    ("Address", "Addr"),
    ("Occupation", "Occ"),
    ("Yes", "Accomp"),
    ("Relationship", "Rel"),
];

/// Value abbreviations for IMM 5257E (country codes and visa kinds).
pub const VALUE_ABBREVIATIONS_5257E: &[(&str, &str)] = &[
    ("BIOMETRIC ENROLMENT", "Bio"),
    ("223", "IRAN"),
    ("045", "TURKEY"),
];

/// Keys of IMM 5257E carrying no applicant data.
pub const DROP_KEYS_5257E: &[&str] = &[
    "xfa:datasets.@xmlns:xfa",
    "P1.Header.CRCNum",
    "P1.FormVersion",
    "P1.PD.UCIClientID",
    "P1.PD.SecHeader.@xfa:dataNode",
    "P1.PD.CurrCOR.Row1.@xfa:dataNode",
    "P1.PD.PrevCOR.Row1.@xfa:dataNode",
    "P1.PD.CWA.Row1.@xfa:dataNode",
    "P1.PD.ApplicationValidatedFlag",
    "P2.MS.SecA.SecHeader.@xfa:dataNode",
    "P2.MS.SecA.PsprtSecHeader.@xfa:dataNode",
    "P2.MS.SecA.Langs.languagesHeader.@xfa:dataNode",
    "P2.natID.SecHeader.@xfa:dataNode",
    "P2.USCard.SecHeader.@xfa:dataNode",
    "P2.CI.cntct.cntctInfoSecHeader.@xfa:dataNode",
    "P3.SecHeader_DOV.@xfa:dataNode",
    "P3.Edu.Edu_SecHeader.@xfa:dataNode",
    "P3.Occ.SecHeader_CurrOcc.@xfa:dataNode",
    "P3.BGI_SecHeader.@xfa:dataNode",
    "P3.Sign.Consent0.Choice",
    "P3.Sign.hand.@xfa:dataNode",
    "P3.Sign.TextField2",
    "P3.Disclosure.@xfa:dataNode",
    "P3.ReaderInfo",
    "Barcodes.@xfa:dataNode",
];

/// Keys of IMM 5645E carrying no applicant data.
pub const DROP_KEYS_5645E: &[&str] = &[
    "xfa:datasets.@xmlns:xfa",
    "p1.SecA.Title.@xfa:dataNode",
    "p1.SecB.SecBsignature",
    "p1.SecB.SecBdate",
    "p1.SecC.Title.@xfa:dataNode",
    "p1.SecA.SecAsignature",
    "p1.SecA.SecAdate",
    "p1.SecB.Title.@xfa:dataNode",
    "p1.SecC.SecCsignature",
    "p1.SecC.Subform2.@xfa:dataNode",
    "formNum",
];

type Compiled = std::result::Result<AbbreviationTable, String>;

lazy_static! {
    static ref KEYS_5257E: Compiled = compile(KEY_ABBREVIATIONS_5257E);
    static ref KEYS_5645E: Compiled = compile(KEY_ABBREVIATIONS_5645E);
    static ref VALUES_5257E: Compiled = compile(VALUE_ABBREVIATIONS_5257E);
}

fn compile(pairs: &[(&str, &str)]) -> Compiled {
    AbbreviationTable::new(pairs).map_err(|e| e.to_string())
}

fn loaded(table: &'static Compiled, what: &str) -> Result<&'static AbbreviationTable> {
    table
        .as_ref()
        .map_err(|e| Error::ConfigLookup(format!("{} table: {}", what, e)))
}

/// Compiled key abbreviation table for `doc_type`, if it has one.
pub fn key_abbreviations(doc_type: DocType) -> Result<Option<&'static AbbreviationTable>> {
    match doc_type {
        DocType::Canada5257E => loaded(&KEYS_5257E, "5257E key").map(Some),
        DocType::Canada5645E => loaded(&KEYS_5645E, "5645E key").map(Some),
        DocType::Canada | DocType::CanadaLabel => Ok(None),
    }
}

/// Compiled value abbreviation table for `doc_type`, if it has one.
pub fn value_abbreviations(doc_type: DocType) -> Result<Option<&'static AbbreviationTable>> {
    match doc_type {
        DocType::Canada5257E => loaded(&VALUES_5257E, "5257E value").map(Some),
        _ => Ok(None),
    }
}

/// Junk keys removed before any field logic for `doc_type`.
pub fn drop_keys(doc_type: DocType) -> &'static [&'static str] {
    match doc_type {
        DocType::Canada5257E => DROP_KEYS_5257E,
        DocType::Canada5645E => DROP_KEYS_5645E,
        DocType::Canada | DocType::CanadaLabel => &[],
    }
}
