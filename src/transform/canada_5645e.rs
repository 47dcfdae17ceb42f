//! Transform chain of IMM 5645E (Family Information).
//!
//! The form is signed on `p1.SecC.SecCdate`; when that is empty the
//! certificate issue date of the matching IMM 5257E is used instead. Children
//! and siblings are fixed-size slots, most of them left blank: a slot holding
//! only defaults is treated as absent and gets an age of zero.

use super::dates::DurationRule;
use super::{
    run_steps, Coercion, FieldOp, FieldRule, FillPolicy, GhostCheck, RepeatedBlock, RepeatedItem,
    Step, TransformContext,
};
use crate::error::Result;
use crate::forms::{fill, tables, DocType};
use crate::record::FlatRecord;
use chrono::NaiveDateTime;

/// Date the form was signed on.
pub const SIGNATURE_DATE: &str = "p1.SecC.SecCdate";

fn since_signature() -> FillPolicy {
    FillPolicy::field(SIGNATURE_DATE)
}

fn parent(member: &str) -> Vec<Step> {
    let base = format!("p1.SecA.{}", member);
    vec![
        Step::cast(format!("{}.{}DOB", base, member), Coercion::ToDate, since_signature()),
        Step::cast(
            format!("{}.{}Occ", base, member),
            Coercion::ToString,
            FillPolicy::literal(fill::OCCUPATION),
        ),
        Step::cast(
            format!("{}.ChdMStatus", base),
            Coercion::ToInt,
            FillPolicy::literal(fill::CHILD_MARRIAGE_STATUS),
        ),
        Step::flag(format!("{}.{}Accomp", base, member), "1"),
    ]
}

fn relative(section: &str, index: usize) -> RepeatedItem {
    let slot = format!("p1.{}.Chd.[{}]", section, index);
    let key = |field: &str| format!("{}.{}", slot, field);
    RepeatedItem {
        rules: vec![
            FieldRule::cast(
                key("ChdMStatus"),
                Coercion::ToInt,
                FillPolicy::literal(fill::CHILD_MARRIAGE_STATUS),
            ),
            FieldRule::cast(
                key("ChdRel"),
                Coercion::ToString,
                FillPolicy::literal(fill::CHILD_RELATION),
            ),
            FieldRule::cast(key("ChdDOB"), Coercion::ToDate, FillPolicy::Skip),
            FieldRule::cast(key("ChdCOB"), Coercion::ToString, FillPolicy::literal(fill::COUNTRY)),
            FieldRule::cast(
                key("ChdOcc"),
                Coercion::ToString,
                FillPolicy::literal(fill::OCCUPATION),
            ),
            FieldRule::flag(key("ChdAccomp"), "1"),
        ],
        ghost: Some(GhostCheck {
            marital_status: key("ChdMStatus"),
            relation: key("ChdRel"),
            date_of_birth: key("ChdDOB"),
            accompanying: key("ChdAccomp"),
            fill: since_signature(),
        }),
        durations: vec![DurationRule::elapsed_until(key("ChdDOB"), SIGNATURE_DATE)],
    }
}

fn child(index: usize) -> RepeatedItem {
    relative("SecB", index)
}

fn sibling(index: usize) -> RepeatedItem {
    relative("SecC", index)
}

/// The full IMM 5645E chain.
pub fn steps() -> Vec<Step> {
    let mut steps = vec![
        Step::DropKeys(tables::DROP_KEYS_5645E),
        Step::Matching {
            needle: "p1.Subform1",
            op: FieldOp::Cast {
                to: Coercion::ToInt,
                fill: FillPolicy::literal(fill::VISA_APPLICATION_TYPE),
            },
        },
        Step::DropContaining("No"),
        Step::cast(
            "p1.SecA.App.ChdMStatus",
            Coercion::ToInt,
            FillPolicy::literal(fill::CHILD_MARRIAGE_STATUS),
        ),
        Step::cast(SIGNATURE_DATE, Coercion::ToDate, FillPolicy::ReferenceDate),
        // spouse
        Step::cast("p1.SecA.Sps.SpsDOB", Coercion::ToDate, since_signature()),
        Step::cast("p1.SecA.Sps.SpsCOB", Coercion::ToString, FillPolicy::Skip),
        Step::cast(
            "p1.SecA.Sps.SpsOcc",
            Coercion::ToString,
            FillPolicy::literal(fill::OCCUPATION),
        ),
        Step::flag("p1.SecA.Sps.SpsAccomp", "1"),
    ];
    steps.extend(parent("Mo"));
    steps.extend(parent("Fa"));
    steps.extend([
        Step::Repeated(RepeatedBlock {
            prefix: "p1.SecB.Chd",
            fields_per_item: 7,
            first_index: 0,
            item: child,
        }),
        Step::Repeated(RepeatedBlock {
            prefix: "p1.SecC.Chd",
            fields_per_item: 8,
            first_index: 0,
            item: sibling,
        }),
        Step::Duration(DurationRule::elapsed_until("p1.SecA.Sps.SpsDOB", SIGNATURE_DATE)),
        Step::Duration(DurationRule::elapsed_until("p1.SecA.Mo.MoDOB", SIGNATURE_DATE)),
        Step::Duration(DurationRule::elapsed_until("p1.SecA.Fa.FaDOB", SIGNATURE_DATE)),
    ]);
    steps
}

/// Normalize an abbreviated IMM 5645E record.
///
/// `reference_date` fills an empty signature date.
pub fn transform(record: FlatRecord, reference_date: Option<NaiveDateTime>) -> Result<FlatRecord> {
    log::info!("Transforming {} record ({} keys)", DocType::Canada5645E, record.len());
    let ctx = TransformContext::with_reference_date(reference_date);
    run_steps(record, &steps(), &ctx)
}
