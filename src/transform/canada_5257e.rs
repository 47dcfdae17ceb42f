//! Transform chain of IMM 5257E (Application for Temporary Resident Visa).
//!
//! Most dates are filled from the certificate issue date printed on the last
//! page, which stands in for "today"; the date of birth seeds the start of the
//! current residence. The chain ends by folding every date pair into a number
//! of days.

use super::dates::DurationRule;
use super::{run_steps, Coercion, FieldRule, FillPolicy, RepeatedBlock, RepeatedItem, Step, TransformContext};
use crate::error::Result;
use crate::forms::{fill, tables, DocType};
use crate::record::FlatRecord;
use chrono::NaiveDateTime;

/// Date the form was validated on.
pub const CERTIFICATE_ISSUE_DATE: &str = "P3.Sign.C1CertificateIssueDate";
/// Applicant date of birth.
pub const DATE_OF_BIRTH: &str = "P1.PD.DOBYear";

const PASSPORT_EXPIRY: &str = "P2.MS.SecA.Psprt.ExpiryDate";

fn text(key: &str, value: &str) -> Step {
    Step::cast(key, Coercion::ToString, FillPolicy::literal(value))
}

fn int(key: &str, value: i64) -> Step {
    Step::cast(key, Coercion::ToInt, FillPolicy::literal(value))
}

fn boolean(key: &str, value: bool) -> Step {
    Step::cast(key, Coercion::ToBool, FillPolicy::literal(value))
}

fn date(key: &str, fill: FillPolicy) -> Step {
    Step::cast(key, Coercion::ToDate, fill)
}

fn until_certificate(key: &str) -> Step {
    date(key, FillPolicy::field(CERTIFICATE_ISSUE_DATE))
}

fn previous_residence(index: usize) -> RepeatedItem {
    let row = format!("P1.PD.PrevCOR.Row{}", index);
    let cert = || FillPolicy::field(CERTIFICATE_ISSUE_DATE);
    RepeatedItem {
        rules: vec![
            FieldRule::cast(
                format!("{}.Country", row),
                Coercion::ToString,
                FillPolicy::literal(fill::PREVIOUS_COUNTRY),
            ),
            FieldRule::cast(
                format!("{}.Status", row),
                Coercion::ToInt,
                FillPolicy::literal(fill::RESIDENCY_STATUS),
            ),
            FieldRule::cast(format!("{}.FromDate", row), Coercion::ToDate, cert()),
            FieldRule::cast(format!("{}.ToDate", row), Coercion::ToDate, cert()),
        ],
        ghost: None,
        durations: vec![DurationRule::period(row)],
    }
}

fn occupation(index: usize) -> RepeatedItem {
    let row = format!("P3.Occ.OccRow{}", index);
    let cert = || FillPolicy::field(CERTIFICATE_ISSUE_DATE);
    RepeatedItem {
        rules: vec![
            FieldRule::cast(format!("{}.FromYear", row), Coercion::ToDate, cert()),
            FieldRule::cast(format!("{}.ToYear", row), Coercion::ToDate, cert()),
            FieldRule::cast(
                format!("{}.Occ.Occ", row),
                Coercion::ToString,
                FillPolicy::literal(fill::OCCUPATION),
            ),
            FieldRule::cast(
                format!("{}.Country.Country", row),
                Coercion::ToString,
                FillPolicy::literal(fill::COUNTRY),
            ),
        ],
        ghost: None,
        durations: vec![DurationRule::period(row)],
    }
}

/// The full IMM 5257E chain.
pub fn steps() -> Vec<Step> {
    vec![
        Step::DropKeys(tables::DROP_KEYS_5257E),
        // personal details
        Step::flag("P1.AdultFlag", "adult"),
        Step::cast("P1.PD.ServiceIn.ServiceIn", Coercion::ToInt, FillPolicy::Skip),
        Step::flag("P1.PD.AliasName.AliasNameIndicator.AliasNameIndicator", "Y"),
        text("P1.PD.VisaType.VisaType", fill::VISA_TYPE),
        text("P1.PD.PlaceBirthCity", fill::PLACE_BIRTH_CITY),
        text("P1.PD.PlaceBirthCountry", fill::COUNTRY),
        text("P1.PD.Citizenship.Citizenship", fill::CITIZENSHIP),
        // current country of residence
        text("P1.PD.CurrCOR.Row2.Country", fill::COUNTRY),
        int("P1.PD.CurrCOR.Row2.Status", fill::RESIDENCY_STATUS),
        boolean("P1.PD.CurrCOR.Row2.Other", fill::OTHER_DESCRIPTION_INDICATOR),
        date(CERTIFICATE_ISSUE_DATE, FillPolicy::Skip),
        date(DATE_OF_BIRTH, FillPolicy::Skip),
        date("P1.PD.CurrCOR.Row2.FromDate", FillPolicy::field(DATE_OF_BIRTH)),
        until_certificate("P1.PD.CurrCOR.Row2.ToDate"),
        Step::flag("P1.PD.PCRIndicator", "Y"),
        Step::Repeated(RepeatedBlock {
            prefix: "P1.PD.PrevCOR.",
            fields_per_item: 4,
            first_index: 2,
            item: previous_residence,
        }),
        // country where applying
        Step::flag("P1.PD.SameAsCORIndicator", "Y"),
        text("P1.PD.CWA.Row2.Country", fill::COUNTRY_WHERE_APPLYING),
        int("P1.PD.CWA.Row2.Status", fill::RESIDENCY_STATUS),
        boolean("P1.PD.CWA.Row2.Other", fill::OTHER_DESCRIPTION_INDICATOR),
        until_certificate("P1.PD.CWA.Row2.FromDate"),
        until_certificate("P1.PD.CWA.Row2.ToDate"),
        // marriage
        until_certificate("P1.MS.SecA.DateOfMarr"),
        Step::flag("P2.MS.SecA.PrevMarrIndicator", "Y"),
        text("P2.MS.SecA.TypeOfRelationship", fill::MARRIAGE_TYPE),
        until_certificate("P2.MS.SecA.PrevSpouseDOB.DOBYear"),
        until_certificate("P2.MS.SecA.FromDate"),
        until_certificate("P2.MS.SecA.ToDate.ToDate"),
        // passport
        text("P2.MS.SecA.Psprt.CountryofIssue.CountryofIssue", fill::PASSPORT_COUNTRY),
        date(
            PASSPORT_EXPIRY,
            FillPolicy::FieldRefShiftedYears {
                key: CERTIFICATE_ISSUE_DATE.to_string(),
                years: -1,
            },
        ),
        // languages
        text("P2.MS.SecA.Langs.languages.nativeLang.nativeLang", fill::NATIVE_LANG),
        text(
            "P2.MS.SecA.Langs.languages.ableToCommunicate.ableToCommunicate",
            fill::LANGUAGES_ABLE,
        ),
        Step::flag("P2.MS.SecA.Langs.LangTest", "Y"),
        // national identity and US card
        Step::flag("P2.natID.q1.natIDIndicator", "Y"),
        text("P2.natID.natIDdocs.CountryofIssue.CountryofIssue", fill::ID_COUNTRY),
        Step::flag("P2.USCard.q1.usCardIndicator", "Y"),
        // contact
        Step::flag("P2.CI.cntct.PhnNums.Phn.CanadaUS", "1"),
        Step::flag("P2.CI.cntct.PhnNums.AltPhn.CanadaUS", "1"),
        // details of visit
        int("P3.DOV.PrpsRow1.PrpsOfVisit.PrpsOfVisit", fill::PURPOSE_OF_VISIT),
        boolean("P3.DOV.PrpsRow1.Other.Other", fill::OTHER_DESCRIPTION_INDICATOR),
        until_certificate("P3.DOV.PrpsRow1.HLS.FromDate"),
        until_certificate("P3.DOV.PrpsRow1.HLS.ToDate"),
        Step::cast("P3.DOV.PrpsRow1.Funds.Funds", Coercion::ToInt, FillPolicy::Skip),
        text("P3.DOV.cntcts_Row1.RelationshipToMe.RelationshipToMe", fill::CONTACT_TYPE),
        text("P3.cntcts_Row2.Relationship.RelationshipToMe", fill::CONTACT_TYPE),
        // education
        Step::flag("P3.Edu.EduIndicator", "Y"),
        until_certificate("P3.Edu.Edu_Row1.FromYear"),
        until_certificate("P3.Edu.Edu_Row1.ToYear"),
        text("P3.Edu.Edu_Row1.Country.Country", fill::COUNTRY),
        Step::cast("P3.Edu.Edu_Row1.FieldOfStudy", Coercion::ToString, FillPolicy::Skip),
        // occupation
        Step::Repeated(RepeatedBlock {
            prefix: "P3.Occ.OccRow",
            fields_per_item: 9,
            first_index: 1,
            item: occupation,
        }),
        // background
        boolean("P3.BGI.Details.MedicalDetails", fill::INDICATOR_FIELD),
        boolean("P3.BGI.otherThanMedic", fill::INDICATOR_FIELD),
        Step::flag("P3.noAuthStay", "Y"),
        Step::flag("P3.refuseDeport", "Y"),
        Step::flag("P3.BGI2.PrevApply", "Y"),
        Step::flag("P3.PWrapper.criminalRec", "Y"),
        Step::flag("P3.PWrapper.Military.Choice", "Y"),
        Step::flag("P3.PWrapper.politicViol", "Y"),
        Step::flag("P3.PWrapper.witnessIllTreat", "Y"),
        // durations
        Step::Duration(DurationRule::period("P1.PD.CurrCOR.Row2")),
        Step::Duration(DurationRule::period("P1.PD.CWA.Row2")),
        Step::Duration(DurationRule::period("P2.MS.SecA")),
        Step::Duration(DurationRule::period("P3.DOV.PrpsRow1.HLS")),
        Step::Duration(DurationRule::period("P3.Edu.Edu_Row1")),
        Step::Duration(DurationRule::elapsed_until(DATE_OF_BIRTH, CERTIFICATE_ISSUE_DATE)),
        Step::Duration(DurationRule::elapsed_until("P1.MS.SecA.DateOfMarr", CERTIFICATE_ISSUE_DATE)),
        Step::Duration(DurationRule::elapsed_until(
            "P2.MS.SecA.PrevSpouseDOB.DOBYear",
            CERTIFICATE_ISSUE_DATE,
        )),
        Step::Duration(DurationRule::remaining_since(PASSPORT_EXPIRY, CERTIFICATE_ISSUE_DATE)),
    ]
}

/// Normalize an abbreviated IMM 5257E record.
///
/// Returns the record and the parsed certificate issue date, which later
/// forms of the same application use as their reference date.
pub fn transform(record: FlatRecord) -> Result<(FlatRecord, Option<NaiveDateTime>)> {
    log::info!("Transforming {} record ({} keys)", DocType::Canada5257E, record.len());
    let record = run_steps(record, &steps(), &TransformContext::default())?;
    let reference = record.get(CERTIFICATE_ISSUE_DATE).and_then(|v| v.as_date());
    if reference.is_none() {
        log::warn!("No certificate issue date in {} record", DocType::Canada5257E);
    }
    Ok((record, reference))
}
