//! Script-facing values.
//!
//! Everything that crosses the boundary between the interpreter and the host
//! (assertion operands, environment writes, response bodies) is converted into a
//! [`ScriptValue`] first. Conversions are explicit: matchers call
//! [`ScriptValue::to_number`], [`ScriptValue::is_truthy`] or
//! [`ScriptValue::to_display_string`] rather than relying on dynamic casts.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A dynamically typed value as seen by user scripts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    /// `null` (and `undefined`, which the host does not distinguish).
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Scripts only have one numeric type.
    Number(f64),
    /// A string.
    String(String),
    /// An ordered sequence.
    Array(Vec<ScriptValue>),
    /// An ordered string-keyed map.
    Object(IndexMap<String, ScriptValue>),
}

impl ScriptValue {
    /// Returns true for `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Script truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy,
    /// everything else (including empty arrays and objects) is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Numeric coercion used by the ordering matchers.
    ///
    /// Strings are trimmed and parsed; the empty string is `0`. Values with no
    /// numeric reading yield `NaN`, which makes every ordering comparison fail.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => parse_number(s),
            Self::Array(_) | Self::Object(_) => f64::NAN,
        }
    }

    /// Renders the value the way it is shown to users (expected/actual columns,
    /// environment writes, console output). Strings are rendered raw; arrays and
    /// objects as compact JSON.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => self.to_json().to_string(),
        }
    }

    /// Length of a string (in UTF-16 code units, as scripts count it), an array,
    /// or an object's key count. Other values have no length.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.encode_utf16().count()),
            Self::Array(items) => Some(items.len()),
            Self::Object(map) => Some(map.len()),
            Self::Null | Self::Bool(_) | Self::Number(_) => None,
        }
    }

    /// Converts into a `serde_json::Value`. Non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Parses `text` as JSON when it looks like a JSON document (an object or an
    /// array); otherwise keeps it as a string.
    #[must_use]
    pub fn from_body_text(text: &str) -> Self {
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
                return Self::from(json);
            }
        }
        Self::String(text.to_string())
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<serde_json::Value> for ScriptValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ScriptValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan"; scripts do not.
        _ if trimmed.chars().any(char::is_alphabetic)
            && !trimmed.contains(['e', 'E']) =>
        {
            f64::NAN
        }
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// Formats a number the way scripts print it: integral values without a
/// fractional part, `NaN` and `Infinity` spelled out.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!ScriptValue::Null.is_truthy());
        assert!(!ScriptValue::Bool(false).is_truthy());
        assert!(!ScriptValue::Number(0.0).is_truthy());
        assert!(!ScriptValue::Number(f64::NAN).is_truthy());
        assert!(!ScriptValue::from("").is_truthy());
        assert!(ScriptValue::from("0").is_truthy());
        assert!(ScriptValue::Array(Vec::new()).is_truthy());
        assert!(ScriptValue::Object(IndexMap::new()).is_truthy());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(ScriptValue::from(" 42 ").to_number(), 42.0);
        assert_eq!(ScriptValue::from("").to_number(), 0.0);
        assert_eq!(ScriptValue::Bool(true).to_number(), 1.0);
        assert_eq!(ScriptValue::Null.to_number(), 0.0);
        assert_eq!(ScriptValue::from("1e3").to_number(), 1000.0);
        assert!(ScriptValue::from("abc").to_number().is_nan());
        assert!(ScriptValue::from("inf").to_number().is_nan());
        assert!(ScriptValue::Array(Vec::new()).to_number().is_nan());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(ScriptValue::Number(5.0).to_display_string(), "5");
        assert_eq!(ScriptValue::Number(2.5).to_display_string(), "2.5");
        assert_eq!(ScriptValue::Number(-0.0).to_display_string(), "0");
        assert_eq!(ScriptValue::Null.to_display_string(), "null");
        assert_eq!(ScriptValue::from("hi").to_display_string(), "hi");
        let value = ScriptValue::from(json!({"a": [1, true]}));
        assert_eq!(value.to_display_string(), r#"{"a":[1,true]}"#);
    }

    #[test]
    fn test_length() {
        assert_eq!(ScriptValue::from("héllo").length(), Some(5));
        assert_eq!(ScriptValue::from(json!([1, 2, 3])).length(), Some(3));
        assert_eq!(ScriptValue::from(json!({"a": 1})).length(), Some(1));
        assert_eq!(ScriptValue::Number(3.0).length(), None);
    }

    #[test]
    fn test_from_body_text() {
        let parsed = ScriptValue::from_body_text(r#"{"id": 7}"#);
        assert_eq!(parsed, ScriptValue::from(json!({"id": 7})));

        let raw = ScriptValue::from_body_text("plain text");
        assert_eq!(raw, ScriptValue::from("plain text"));

        let broken = ScriptValue::from_body_text("{not json");
        assert_eq!(broken, ScriptValue::from("{not json"));

        // Scalars are not treated as JSON documents.
        assert_eq!(ScriptValue::from_body_text("42"), ScriptValue::from("42"));
    }

    #[test]
    fn test_json_preserves_key_order() {
        let value = ScriptValue::from(json!({"z": 1, "a": 2}));
        let ScriptValue::Object(map) = &value else {
            panic!("expected object");
        };
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
        assert_eq!(value.to_json(), json!({"z": 1, "a": 2}));
    }
}
