//! Parameter extraction from payload elements.
//!
//! Pure functions, no state. Same-named children of a payload element are
//! grouped: a single occurrence yields a scalar parameter (or `Null` when
//! the nil marker is set), repeated occurrences yield an array parameter in
//! document order. Batch payloads yield one flat map per top-level child,
//! list order matching payload order.
//!
//! No type validation happens here; that is deferred to operation
//! execution.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::payload::Element;

/// A named parameter value: scalar, explicit null, or array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    Null,
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The array entries, if this is an array.
    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

/// A flat parameter map for one operation invocation.
pub type Params = HashMap<String, ParamValue>;

fn leaf_value(element: &Element) -> ParamValue {
    if element.is_nil() {
        ParamValue::Null
    } else {
        ParamValue::Scalar(element.text().to_string())
    }
}

/// Extract a flat parameter map from a payload element.
pub fn extract_params(payload: &Element) -> Params {
    let mut params = Params::new();
    for child in payload.children() {
        let value = leaf_value(child);
        match params.entry(child.name().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                ParamValue::Array(values) => values.push(value),
                single => {
                    let first = std::mem::replace(single, ParamValue::Null);
                    *single = ParamValue::Array(vec![first, value]);
                }
            },
        }
    }
    params
}

/// Extract an ordered list of parameter maps from a batch payload.
///
/// Each top-level child independently yields one flat map through the same
/// scalar/array logic as [`extract_params`].
pub fn extract_batch_params(payload: &Element) -> Vec<Params> {
    payload.children().iter().map(extract_params).collect()
}
