use std::borrow::Cow;

use serde_json::{Map, Value};

/// Engine payload: a JSON object whose fields are all optional.
pub type Payload = Map<String, Value>;

/// One decoded SSE frame from the task engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineEvent {
    /// Event category, for example `agent:response` or `goal:completed`.
    pub name: String,
    /// Engine-provided structured data.
    pub payload: Payload,
}

impl EngineEvent {
    /// Creates an event from a name and payload object.
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Creates an event from a JSON value, keeping it only if it is an object.
    pub fn from_value(name: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(payload) => Some(Self::new(name, payload)),
            _ => None,
        }
    }
}

/// Returns the first candidate field usable as a label, such as a task title,
/// agent name or id.
///
/// Strings count when they are not blank; numbers are rendered so numeric ids
/// still produce a label. Any other type is skipped.
pub(crate) fn first_text<'a>(payload: &'a Payload, keys: &[&str]) -> Option<Cow<'a, str>> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    })
}

/// Returns the first candidate field holding a non-empty string, verbatim.
///
/// Whitespace is content here; other value types are skipped.
pub(crate) fn first_string<'a>(payload: &'a Payload, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    })
}

/// Like [`first_string`], but also accepts an object carrying a `message` field.
///
/// Engines report errors either as `"error": "text"` or as
/// `"error": {"message": "text"}`.
pub(crate) fn first_message<'a>(payload: &'a Payload, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(inner) => first_string(inner, &["message", "error"]),
        _ => None,
    })
}

/// Returns the first candidate field usable as a count.
///
/// Non-negative integers are taken as-is and arrays count their elements.
pub(crate) fn first_count(payload: &Payload, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::Number(n) => n.as_u64(),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    })
}

/// Returns a nested object field, if present.
pub(crate) fn nested<'a>(payload: &'a Payload, key: &str) -> Option<&'a Payload> {
    payload.get(key).and_then(Value::as_object)
}
