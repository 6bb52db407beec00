use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ResponseSpec;
use crate::value::ScriptValue;

/// Read-only snapshot of a response handed to a post-response script.
///
/// Built right after the response arrives and dropped once the script has run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseContext {
    /// Numeric status code, exposed as `pw.response.status`.
    pub status_code: u16,
    /// Raw body text.
    pub body: String,
    /// Header name to value.
    pub headers: IndexMap<String, String>,
    /// Exposed as `pw.response.time`.
    pub response_time_ms: u64,
    /// Exposed as `pw.response.size`.
    pub response_size_bytes: u64,
}

impl ResponseContext {
    /// A response used when a post-response script is run stand-alone.
    #[must_use]
    pub fn synthetic(status_code: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status_code,
            response_size_bytes: body.len() as u64,
            body,
            headers: IndexMap::new(),
            response_time_ms: 0,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The body as scripts see it: a parsed structure when it is a JSON object
    /// or array, the raw string otherwise.
    #[must_use]
    pub fn body_value(&self) -> ScriptValue {
        ScriptValue::from_body_text(&self.body)
    }

    /// The headers as a script object.
    #[must_use]
    pub fn headers_value(&self) -> ScriptValue {
        ScriptValue::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), ScriptValue::from(v.as_str())))
                .collect(),
        )
    }
}

impl From<&ResponseSpec> for ResponseContext {
    #[allow(clippy::cast_possible_truncation)]
    fn from(response: &ResponseSpec) -> Self {
        Self {
            status_code: response.status,
            body: response.body.clone(),
            headers: response.headers.clone(),
            response_time_ms: response.duration.as_millis() as u64,
            response_size_bytes: response.size as u64,
        }
    }
}
