//! Request definition

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::HttpMethod;
use crate::error::{DomainError, DomainResult};
use crate::scripting::RequestScripts;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// One HTTP request with its scripts.
///
/// URL, header values and body may contain `{{name}}` placeholders that are
/// resolved against the environment just before sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Target URL template.
    pub url: String,
    /// Header name to value template.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    /// Body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Per-request timeout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Pre-request and post-response scripts.
    #[serde(default, skip_serializing_if = "RequestScripts::is_empty")]
    pub scripts: RequestScripts,
}

impl RequestSpec {
    /// Creates a new request.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
            timeout_ms: None,
            scripts: RequestScripts::default(),
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("", HttpMethod::Get, url)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the scripts.
    #[must_use]
    pub fn with_scripts(mut self, scripts: RequestScripts) -> Self {
        self.scripts = scripts;
        self
    }

    /// The effective timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Checks the resolved URL and header names.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] for an empty URL or one without an
    /// `http`/`https` scheme, and [`DomainError::InvalidHeaderName`] for an
    /// empty or whitespace-containing header name.
    pub fn validate(&self) -> DomainResult<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(DomainError::InvalidUrl("URL cannot be empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DomainError::InvalidUrl(format!(
                "URL must start with http:// or https://, got {url}"
            )));
        }
        if let Some(name) = self
            .headers
            .keys()
            .find(|name| name.is_empty() || name.chars().any(char::is_whitespace))
        {
            return Err(DomainError::InvalidHeaderName(name.clone()));
        }
        Ok(())
    }
}
