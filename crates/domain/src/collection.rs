//! Collections: named, ordered groups of requests with a seed environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::request::RequestSpec;
use crate::scripting::SandboxLimits;

/// A collection file's content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collection {
    /// Display name.
    pub name: String,
    /// Variables seeded into the environment before the first request, in order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    /// Sandbox limits for every script in this collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SandboxLimits>,
    /// Requests, run in order.
    #[serde(default)]
    pub requests: Vec<RequestSpec>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a request.
    #[must_use]
    pub fn with_request(mut self, request: RequestSpec) -> Self {
        self.requests.push(request);
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// The limits to run this collection with.
    #[must_use]
    pub fn effective_limits(&self) -> SandboxLimits {
        self.limits.unwrap_or_default()
    }
}
