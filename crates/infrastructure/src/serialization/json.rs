//! Serialization helpers for collection files and run reports.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to JSON with 2-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    Ok(serde_json::from_str(json)?)
}

/// Deserializes YAML from a string.
///
/// # Errors
///
/// Returns an error if the YAML is invalid or doesn't match the expected type.
pub fn from_yaml<T: DeserializeOwned>(yaml: &str) -> Result<T, SerializationError> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stable_output_keeps_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        assert_eq!(to_json_stable(&map).unwrap(), "{\n  \"zeta\": 1,\n  \"alpha\": 2\n}\n");
    }

    #[test]
    fn test_yaml_and_json_agree() {
        let from_yaml: IndexMap<String, u32> = from_yaml("a: 1\nb: 2\n").unwrap();
        let from_json: IndexMap<String, u32> = from_json(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(from_json::<u32>("nope"), Err(SerializationError::Json(_))));
        assert!(matches!(from_yaml::<u32>("[1"), Err(SerializationError::Yaml(_))));
    }
}
