//! Feed file parsing.
//!
//! The generator writes a YML (Yandex Market Language) document with the
//! shape `yml_catalog.shop.{categories.category*, offers.offer*}`. The
//! records themselves are free-form; they are parsed into JSON trees and
//! served verbatim, not validated against a schema.
//!
//! Mapping rules:
//! - an element with neither attributes nor children becomes its text, or
//!   `null` when empty;
//! - attributes merge into the element object as plain keys;
//! - element text alongside attributes or children lands under `"$text"`;
//! - repeated sibling names collect into an array.
//!
//! The `category`/`offer` level is then normalized so that a single child
//! and a sequence of children produce the same shape: always an array.

use larkspur_core::Catalog;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use super::FeedError;

/// Parse a feed document into a catalog snapshot.
///
/// A missing `categories` or `offers` section yields an empty sequence. A
/// missing `yml_catalog.shop` path is a format error.
///
/// # Errors
///
/// Returns `FeedError::InvalidFormat` if the document is not well-formed
/// XML or the expected top-level structure is absent.
pub fn parse_catalog(xml: &str) -> Result<Catalog, FeedError> {
    let document = document_to_value(xml)?;

    let shop = document
        .get("yml_catalog")
        .and_then(|catalog| catalog.get("shop"))
        .filter(|shop| !shop.is_null())
        .ok_or_else(|| FeedError::InvalidFormat("missing yml_catalog.shop".to_string()))?;

    let categories = normalize_records(shop.get("categories").and_then(|c| c.get("category")));
    let offers = normalize_records(shop.get("offers").and_then(|o| o.get("offer")));

    Ok(Catalog::new(categories, offers))
}

/// Force record cardinality into a sequence: absent or empty sections
/// become an empty Vec, a single record becomes a one-element Vec.
fn normalize_records(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(records)) => records.clone(),
        Some(single) => vec![single.clone()],
    }
}

/// An element being assembled while its subtree is read.
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Element {
    fn root() -> Self {
        Self {
            name: String::new(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn open(start: &BytesStart<'_>) -> Result<Self, FeedError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(invalid)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(invalid)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn close(self) -> Value {
        if self.attrs.is_empty() && self.children.is_empty() {
            return if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
        }

        let mut map = Map::new();
        for (key, value) in self.attrs {
            insert_merged(&mut map, key, Value::String(value));
        }
        for (key, value) in self.children {
            insert_merged(&mut map, key, value);
        }
        if !self.text.is_empty() {
            map.insert("$text".to_string(), Value::String(self.text));
        }
        Value::Object(map)
    }
}

/// Insert a key, collecting repeated names into an array.
fn insert_merged(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn invalid(error: impl std::fmt::Display) -> FeedError {
    FeedError::InvalidFormat(error.to_string())
}

/// Parse a whole XML document into a JSON tree.
fn document_to_value(xml: &str) -> Result<Value, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Element::root()];

    loop {
        match reader.read_event().map_err(invalid)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                let name = element.name.clone();
                let value = element.close();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push((name, value));
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(FeedError::InvalidFormat("unbalanced document".to_string()));
                };
                let name = element.name.clone();
                let value = element.close();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, value)),
                    None => return Err(FeedError::InvalidFormat("unbalanced document".to_string())),
                }
            }
            Event::Text(text) => {
                let decoded = text.unescape().map_err(invalid)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&decoded);
                }
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(FeedError::InvalidFormat(
            "unexpected end of document".to_string(),
        ));
    }
    let Some(root) = stack.pop() else {
        return Err(FeedError::InvalidFormat(
            "unexpected end of document".to_string(),
        ));
    };
    Ok(root.close())
}
