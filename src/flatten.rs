//! Nested tree flattening.
//!
//! Converts a [`Node`] tree (as produced by [`crate::xfa::parse_tree`]) into
//! a single-level [`FlatRecord`]:
//!
//! - mapping children are joined with `.` (`Page1.PersonalDetails.DOBYear`)
//! - list elements are joined with `.[index].` (`SectionB.Child.[0].ChildDOB`)
//! - scalar list elements are emitted under `parent.[index]`
//!
//! Key order follows a pre-order walk of the tree.

use crate::error::Result;
use crate::record::{FlatRecord, Value};
use indexmap::IndexMap;

/// A nested document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Scalar leaf
    Leaf(Value),
    /// Named children in document order
    Map(IndexMap<String, Node>),
    /// Repeated siblings
    List(Vec<Node>),
}

impl Node {
    /// Text leaf helper.
    pub fn text(s: impl Into<String>) -> Self {
        Node::Leaf(Value::Text(s.into()))
    }

    /// Empty mapping.
    pub fn map() -> Self {
        Node::Map(IndexMap::new())
    }
}

/// Flatten a tree into dotted-path keys.
///
/// A bare leaf at the root has no path and produces an empty record.
pub fn flatten(node: &Node) -> FlatRecord {
    let mut out = FlatRecord::new();
    if let Node::Leaf(_) = node {
        return out;
    }
    flatten_into("", node, &mut out);
    out
}

fn flatten_into(prefix: &str, node: &Node, out: &mut FlatRecord) {
    match node {
        Node::Leaf(value) => {
            out.insert(prefix.to_string(), value.clone());
        },
        Node::Map(children) => {
            for (key, child) in children {
                flatten_into(&join(prefix, key), child, out);
            }
        },
        Node::List(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&join(prefix, &format!("[{}]", index)), child, out);
            }
        },
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Parse XFA XML text and flatten it in one step.
pub fn xml_to_flattened(xml: &str) -> Result<FlatRecord> {
    let tree = crate::xfa::parse_tree(xml)?;
    Ok(flatten(&tree))
}
