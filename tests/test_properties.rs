//! Property tests for the record stages.

use canada_xfa::flatten::{flatten, Node};
use canada_xfa::forms::{tables, DocType, CUTOFF_5257E};
use canada_xfa::record::{FlatRecord, Value};
use canada_xfa::summarize::summarize;
use canada_xfa::transform::dates::{aggregate_datetime, standardize_date, DurationRule};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn leaf() -> impl Strategy<Value = Node> {
    "[A-Z0-9]{0,6}".prop_map(|s| {
        if s.is_empty() {
            Node::Leaf(Value::Null)
        } else {
            Node::text(s)
        }
    })
}

fn tree() -> impl Strategy<Value = Node> {
    let node = leaf().prop_recursive(3, 48, 4, |inner| {
        prop_oneof![
            prop::collection::btree_map("[a-z]{1,4}", inner.clone(), 1..4)
                .prop_map(|children| Node::Map(children.into_iter().collect())),
            prop::collection::vec(inner, 2..4).prop_map(Node::List),
        ]
    });
    prop::collection::btree_map("[a-z]{1,4}", node, 1..4)
        .prop_map(|children| Node::Map(children.into_iter().collect()))
}

const SHORT_SEGMENTS: &[&str] = &[
    "P1", "P2", "P3", "PD", "CurrCOR", "PrevCOR", "Row2", "Row3", "Country", "Status", "SecA",
    "DOBYear", "Psprt", "ExpiryDate", "Occ", "OccRow1", "FromYear", "MS", "Sign",
];

fn abbreviated_record() -> impl Strategy<Value = FlatRecord> {
    let key = prop::collection::vec(prop::sample::select(SHORT_SEGMENTS), 1..5)
        .prop_map(|segments| segments.join("."));
    let value = prop_oneof![
        Just(Value::Null),
        prop::sample::select(&["IRAN", "TURKEY", "OTHER", "Bio"][..]).prop_map(Value::from),
        (0i64..100).prop_map(Value::Int),
    ];
    prop::collection::vec((key, value), 0..12).prop_map(|pairs| pairs.into_iter().collect())
}

fn raw_record() -> impl Strategy<Value = FlatRecord> {
    let key = "(Page|P)[1-3]\\.(PersonalDetails|PD|Section|Sec)[A-C]?\\.[A-Za-z]{1,6}";
    prop::collection::vec((key, "[a-z]{0,4}"), 0..16)
        .prop_map(|pairs| pairs.into_iter().map(|(k, v)| (k, Value::Text(v))).collect())
}

fn day() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..60_000).prop_map(|offset| {
        let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        epoch + Duration::days(offset)
    })
}

fn list_index(segment: &str) -> Option<usize> {
    segment.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
}

fn lookup<'a>(node: &'a Node, path: &[&str]) -> Option<&'a Value> {
    match (node, path.split_first()) {
        (Node::Leaf(value), None) => Some(value),
        (Node::Map(children), Some((head, rest))) => lookup(children.get(*head)?, rest),
        (Node::List(items), Some((head, rest))) => lookup(items.get(list_index(head)?)?, rest),
        _ => None,
    }
}

fn insert_path(node: &mut Node, path: &[&str], value: Value) {
    let (head, rest) = match path.split_first() {
        Some(split) => split,
        None => {
            *node = Node::Leaf(value);
            return;
        },
    };
    match list_index(head) {
        Some(index) => {
            if !matches!(node, Node::List(_)) {
                *node = Node::List(Vec::new());
            }
            if let Node::List(items) = node {
                while items.len() <= index {
                    items.push(Node::Leaf(Value::Null));
                }
                insert_path(&mut items[index], rest, value);
            }
        },
        None => {
            if !matches!(node, Node::Map(_)) {
                *node = Node::map();
            }
            if let Node::Map(children) = node {
                let child = children
                    .entry(head.to_string())
                    .or_insert(Node::Leaf(Value::Null));
                insert_path(child, rest, value);
            }
        },
    }
}

fn rebuild(record: &FlatRecord) -> Node {
    let mut root = Node::map();
    for (key, value) in record {
        let path: Vec<&str> = key.split('.').collect();
        insert_path(&mut root, &path, value.clone());
    }
    root
}

fn unparseable() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z][a-z ]{0,9}".prop_map(Value::Text),
        Just(Value::Text("02302020x".into())),
        Just(Value::Text("1990-13-45".into())),
    ]
}

fn leaf_count(node: &Node) -> usize {
    match node {
        Node::Leaf(_) => 1,
        Node::Map(children) => children.values().map(leaf_count).sum(),
        Node::List(items) => items.iter().map(leaf_count).sum(),
    }
}

// ============================================================================
// Flattening
// ============================================================================

proptest! {
    #[test]
    fn prop_flatten_is_reversible(tree in tree()) {
        let record = flatten(&tree);
        prop_assert_eq!(record.len(), leaf_count(&tree));
        for (key, value) in &record {
            let path: Vec<&str> = key.split('.').collect();
            prop_assert_eq!(lookup(&tree, &path), Some(value));
        }
        prop_assert_eq!(rebuild(&record), tree);
    }

    #[test]
    fn prop_list_items_get_index_segments(items in prop::collection::vec(leaf(), 2..6)) {
        let count = items.len();
        let mut children = indexmap::IndexMap::new();
        children.insert("Child".to_string(), Node::List(items));
        let record = flatten(&Node::Map(children));

        let keys: Vec<String> = (0..count).map(|i| format!("Child.[{}]", i)).collect();
        prop_assert_eq!(record.keys().cloned().collect::<Vec<_>>(), keys);
    }
}

// ============================================================================
// Abbreviation
// ============================================================================

proptest! {
    #[test]
    fn prop_summarize_idempotent_on_short_keys(record in abbreviated_record()) {
        let keys = tables::key_abbreviations(DocType::Canada5257E).unwrap();
        let values = tables::value_abbreviations(DocType::Canada5257E).unwrap();

        let once = summarize(record.clone(), CUTOFF_5257E, keys, values);
        let twice = summarize(once.clone(), CUTOFF_5257E, keys, values);
        prop_assert_eq!(&once, &record);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_summarize_never_loses_fields(record in raw_record()) {
        let keys = tables::key_abbreviations(DocType::Canada5257E).unwrap();
        let out = summarize(record.clone(), CUTOFF_5257E, keys, None);
        prop_assert_eq!(out.len(), record.len());

        let mut before: Vec<_> = record.values().cloned().map(|v| v.to_string()).collect();
        let mut after: Vec<_> = out.values().cloned().map(|v| v.to_string()).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }
}

// ============================================================================
// Dates
// ============================================================================

proptest! {
    #[test]
    fn prop_period_is_day_difference(from in day(), to in day()) {
        let mut record = FlatRecord::new();
        record.insert("Row.FromDate".into(), Value::Date(from));
        record.insert("Row.ToDate".into(), Value::Text(to.format("%Y-%m-%d").to_string()));

        let out = aggregate_datetime(record, &DurationRule::period("Row")).unwrap();
        prop_assert_eq!(out.len(), 1);
        prop_assert_eq!(&out["Row.Period"], &Value::Int((to - from).num_days()));
    }

    #[test]
    fn prop_period_skips_missing_endpoint(to in day()) {
        let mut record = FlatRecord::new();
        record.insert("Row.FromDate".into(), Value::Null);
        record.insert("Row.ToDate".into(), Value::Date(to));

        let out = aggregate_datetime(record.clone(), &DurationRule::period("Row")).unwrap();
        prop_assert_eq!(out, record);
    }

    #[test]
    fn prop_period_skips_unparseable_endpoint(
        bad in unparseable(),
        other in prop_oneof![unparseable(), day().prop_map(Value::Date)],
        bad_first in any::<bool>(),
    ) {
        let (from, to) = if bad_first { (bad, other) } else { (other, bad) };
        let mut record = FlatRecord::new();
        record.insert("Row.FromDate".into(), from);
        record.insert("Row.ToDate".into(), to);

        let out = aggregate_datetime(record.clone(), &DurationRule::period("Row")).unwrap();
        prop_assert_eq!(out, record);
    }

    #[test]
    fn prop_compact_dates_standardize(date in day()) {
        let compact = date.format("%m%d%Y").to_string();
        prop_assert_eq!(standardize_date(&compact), date.format("%Y-%m-%d").to_string());
    }
}
