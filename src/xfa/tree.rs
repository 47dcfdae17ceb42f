//! XML to nested tree conversion.
//!
//! Follows the usual XML-to-dictionary conventions:
//! - attributes become `@qualified:name` children, listed first
//! - repeated sibling elements are collected into a [`Node::List`] at the
//!   position of the first occurrence
//! - an element with attributes or children keeps its own text under `#text`
//! - an element with neither becomes a text leaf, or `Null` when empty
//!
//! Element names keep their namespace prefix (`xfa:datasets`).

use crate::error::{Error, Result};
use crate::flatten::Node;
use crate::record::Value;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Key under which mixed-content text is stored.
pub const TEXT_KEY: &str = "#text";

struct Frame {
    name: String,
    attributes: IndexMap<String, Node>,
    children: IndexMap<String, Node>,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut attributes = IndexMap::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                Error::XmlCleaning(format!("bad attribute on <{}>: {}", name, err))
            })?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|err| Error::XmlCleaning(format!("bad attribute value: {}", err)))?;
            attributes.insert(key, Node::text(value.to_string()));
        }
        Ok(Self {
            name,
            attributes,
            children: IndexMap::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Node) {
        let Frame {
            name,
            mut attributes,
            children,
            text,
        } = self;

        if attributes.is_empty() && children.is_empty() {
            let leaf = if text.is_empty() {
                Value::Null
            } else {
                Value::Text(text)
            };
            return (name, Node::Leaf(leaf));
        }

        attributes.extend(children);
        if !text.is_empty() {
            attributes.insert(TEXT_KEY.to_string(), Node::text(text));
        }
        (name, Node::Map(attributes))
    }
}

fn attach(children: &mut IndexMap<String, Node>, name: String, node: Node) {
    match children.get_mut(&name) {
        Some(Node::List(items)) => items.push(node),
        Some(existing) => {
            let first = std::mem::replace(existing, Node::List(Vec::new()));
            *existing = Node::List(vec![first, node]);
        },
        None => {
            children.insert(name, node);
        },
    }
}

/// Parse XML text into a [`Node`] tree rooted at a one-entry map.
pub fn parse_tree(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Node)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(Frame::open(e)?);
            },
            Ok(Event::Empty(ref e)) => {
                let (name, node) = Frame::open(e)?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, node),
                    None => root = Some((name, node)),
                }
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::XmlCleaning(format!("bad text content: {}", err)))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            },
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            },
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::XmlCleaning("unbalanced closing tag".to_string()))?;
                let (name, node) = frame.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, node),
                    None => root = Some((name, node)),
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlCleaning(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            },
            _ => {},
        }
    }

    if let Some(frame) = stack.last() {
        return Err(Error::XmlCleaning(format!("unclosed element <{}>", frame.name)));
    }

    let (name, node) = root.ok_or_else(|| Error::XmlCleaning("document has no root element".to_string()))?;
    let mut top = IndexMap::new();
    top.insert(name, node);
    Ok(Node::Map(top))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child<'a>(node: &'a Node, key: &str) -> &'a Node {
        match node {
            Node::Map(m) => &m[key],
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_attributes_and_prefixes() {
        let xml = r#"<xfa:datasets xmlns:xfa="http://www.xfa.org/schema/xfa-data/1.0/"><xfa:data><form1 xfa:dataNode="dataGroup"/></xfa:data></xfa:datasets>"#;
        let tree = parse_tree(xml).unwrap();
        let datasets = child(&tree, "xfa:datasets");
        assert_eq!(
            child(datasets, "@xmlns:xfa"),
            &Node::text("http://www.xfa.org/schema/xfa-data/1.0/")
        );
        let form = child(child(datasets, "xfa:data"), "form1");
        assert_eq!(child(form, "@xfa:dataNode"), &Node::text("dataGroup"));
    }

    #[test]
    fn test_repeated_siblings_become_list() {
        let xml = "<r><Child><N>a</N></Child><Other/><Child><N>b</N></Child></r>";
        let tree = parse_tree(xml).unwrap();
        let r = child(&tree, "r");
        match child(r, "Child") {
            Node::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(child(&items[1], "N"), &Node::text("b"));
            },
            other => panic!("expected list, got {:?}", other),
        }
        if let Node::Map(m) = r {
            let keys: Vec<&str> = m.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["Child", "Other"]);
        }
    }

    #[test]
    fn test_empty_and_whitespace_elements_are_null() {
        let tree = parse_tree("<r><a></a><b>   </b><c>  x  </c></r>").unwrap();
        let r = child(&tree, "r");
        assert_eq!(child(r, "a"), &Node::Leaf(Value::Null));
        assert_eq!(child(r, "b"), &Node::Leaf(Value::Null));
        assert_eq!(child(r, "c"), &Node::text("x"));
    }

    #[test]
    fn test_mixed_content_uses_text_key() {
        let tree = parse_tree(r#"<r><v unit="CAD">5000</v></r>"#).unwrap();
        let v = child(child(&tree, "r"), "v");
        assert_eq!(child(v, "@unit"), &Node::text("CAD"));
        assert_eq!(child(v, TEXT_KEY), &Node::text("5000"));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let tree = parse_tree("<r><a>A &amp; B</a></r>").unwrap();
        assert_eq!(child(child(&tree, "r"), "a"), &Node::text("A & B"));
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        assert!(matches!(parse_tree("<r><a></r>"), Err(Error::XmlCleaning(_))));
        assert!(matches!(parse_tree("<r><a>"), Err(Error::XmlCleaning(_))));
        assert!(matches!(parse_tree(""), Err(Error::XmlCleaning(_))));
    }
}
