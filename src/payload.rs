//! Structured payload elements.
//!
//! `Element` is the engine's payload tree: a named node carrying text
//! content, an optional nil marker, and an ordered list of child elements.
//! Inbound operation payloads and operation results are both `Element`s.
//!
//! The nil marker distinguishes an explicitly-null value from an element
//! with empty text. Parameter extraction (`crate::params`) maps a
//! nil-marked element to `ParamValue::Null` and an empty element to an
//! empty string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named payload node with text, a nil marker, and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    nil: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
}

impl Element {
    /// Create an empty element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            nil: false,
            children: Vec::new(),
        }
    }

    /// Builder: set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: set the nil marker.
    pub fn with_nil(mut self) -> Self {
        self.nil = true;
        self
    }

    /// Builder: append a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child element in place.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_nil(&self) -> bool {
        self.nil
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }

    /// Find the first child with the given name.
    pub fn child_by_name(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether this element has child elements. Batch classification
    /// applies this to a payload's first child.
    pub fn has_child_elements(&self) -> bool {
        !self.children.is_empty()
    }

    /// Build an element tree from a JSON value.
    ///
    /// Objects become child elements per key (array values yield one child
    /// per entry, preserving order), `null` becomes a nil-marked child, and
    /// scalars become text content.
    pub fn from_json(name: impl Into<String>, value: &Value) -> Self {
        let mut element = Element::new(name);
        match value {
            Value::Null => element.nil = true,
            Value::Object(map) => {
                for (key, child_value) in map {
                    match child_value {
                        Value::Array(entries) => {
                            for entry in entries {
                                element.children.push(Element::from_json(key, entry));
                            }
                        }
                        _ => element.children.push(Element::from_json(key, child_value)),
                    }
                }
            }
            Value::Array(entries) => {
                for entry in entries {
                    element.children.push(Element::from_json("item", entry));
                }
            }
            Value::String(s) => element.text = s.clone(),
            other => element.text = other.to_string(),
        }
        element
    }

    /// Render this element as a JSON value.
    ///
    /// Leaf elements become their text (or `null` when nil-marked);
    /// elements with children become objects, repeated child names
    /// collapsing into arrays in document order.
    pub fn to_json(&self) -> Value {
        if self.children.is_empty() {
            if self.nil {
                return Value::Null;
            }
            return Value::String(self.text.clone());
        }
        let mut map = serde_json::Map::new();
        for child in &self.children {
            let rendered = child.to_json();
            match map.entry(child.name().to_string()) {
                serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                    Value::Array(entries) => entries.push(rendered),
                    existing => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, rendered]);
                    }
                },
                serde_json::map::Entry::Vacant(slot) => {
                    slot.insert(rendered);
                }
            }
        }
        Value::Object(map)
    }
}
