//! Pre-request and post-response scripting.
//!
//! This module provides the types that describe a script, the limits of the
//! sandbox that runs it, and the result a run produces.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::testing::{TestCounts, TestResult};

/// A script that can be executed before a request or after a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    /// The script source.
    pub content: String,
    /// Whether the script is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Default for Script {
    fn default() -> Self {
        Self {
            content: String::new(),
            enabled: true,
        }
    }
}

impl Script {
    /// Create a new empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new script with content.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            enabled: true,
        }
    }

    /// Check if the script is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Check if the script should run.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.enabled && !self.is_empty()
    }
}

/// Pre-request and post-response scripts for a request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RequestScripts {
    /// Script to run before the request.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub pre_request: Script,
    /// Script to run after the response.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub post_response: Script,
}

impl RequestScripts {
    /// Create new empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if both scripts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_request.is_empty() && self.post_response.is_empty()
    }

    /// Set the pre-request script.
    #[must_use]
    pub fn with_pre_request(mut self, script: Script) -> Self {
        self.pre_request = script;
        self
    }

    /// Set the post-response script.
    #[must_use]
    pub fn with_post_response(mut self, script: Script) -> Self {
        self.post_response = script;
        self
    }
}

/// Which variant of the runner a script is executed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    /// Runs before the request is sent; no response is visible.
    PreRequest,
    /// Runs after the response arrived; `pw.response` is bound.
    PostResponse,
}

impl ScriptKind {
    /// Returns the kind as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreRequest => "pre-request",
            Self::PostResponse => "post-response",
        }
    }
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource ceilings applied to every script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Maximum call depth.
    pub recursion_limit: usize,
    /// Maximum iterations a loop may run, the interpreter-side execution budget
    /// that backs up the wall clock.
    ///
    /// The count is shared by every loop in the same function frame, nested
    /// loops included, so a 300 x 300 nested loop exceeds the default in a few
    /// milliseconds.
    /// Exhausting it reports the same timeout message as the wall clock.
    pub statement_limit: u64,
    /// Wall-clock budget for one run.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
}

impl SandboxLimits {
    /// Default call depth ceiling.
    pub const DEFAULT_RECURSION_LIMIT: usize = 100;
    /// Default execution budget.
    pub const DEFAULT_STATEMENT_LIMIT: u64 = 10_000;
    /// Default wall-clock budget.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Overrides the wall-clock budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the execution budget.
    #[must_use]
    pub const fn with_statement_limit(mut self, limit: u64) -> Self {
        self.statement_limit = limit;
        self
    }

    /// Overrides the call depth ceiling.
    #[must_use]
    pub const fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Rejects limits that would make every script fail.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidLimits`] when any limit is zero.
    pub fn validate(&self) -> DomainResult<()> {
        if self.recursion_limit == 0 {
            return Err(DomainError::InvalidLimits("recursion_limit must be > 0".into()));
        }
        if self.statement_limit == 0 {
            return Err(DomainError::InvalidLimits("statement_limit must be > 0".into()));
        }
        if self.timeout.is_zero() {
            return Err(DomainError::InvalidLimits("timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// The message reported when a run exceeds its budget.
    #[must_use]
    pub fn timeout_message(&self) -> String {
        let secs = self.timeout.as_secs_f64();
        if secs.fract() == 0.0 {
            format!("Script execution timed out ({secs:.0} second limit)")
        } else {
            format!("Script execution timed out ({} ms limit)", self.timeout.as_millis())
        }
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            recursion_limit: Self::DEFAULT_RECURSION_LIMIT,
            statement_limit: Self::DEFAULT_STATEMENT_LIMIT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Result of one script run.
///
/// Built once per run and immutable afterwards. A failed run always carries a
/// non-empty error message; logs and tests collected before the failure are
/// kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptExecutionResult {
    success: bool,
    error_message: Option<String>,
    error_line: u32,
    logs: Vec<String>,
    test_results: Vec<TestResult>,
    total_duration_ms: u64,
}

impl ScriptExecutionResult {
    /// The result of running an empty script.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            success: true,
            error_message: None,
            error_line: 0,
            logs: Vec::new(),
            test_results: Vec::new(),
            total_duration_ms: 0,
        }
    }

    /// A script that ran to completion.
    #[must_use]
    pub const fn completed(
        logs: Vec<String>,
        test_results: Vec<TestResult>,
        total_duration_ms: u64,
    ) -> Self {
        Self {
            success: true,
            error_message: None,
            error_line: 0,
            logs,
            test_results,
            total_duration_ms,
        }
    }

    /// A script that failed. An empty `message` is replaced so the failure is
    /// never silent.
    #[must_use]
    pub fn failed(
        message: impl Into<String>,
        error_line: u32,
        logs: Vec<String>,
        test_results: Vec<TestResult>,
        total_duration_ms: u64,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Error: unknown script failure".to_string();
        }
        Self {
            success: false,
            error_message: Some(message),
            error_line,
            logs,
            test_results,
            total_duration_ms,
        }
    }

    /// Whether the script ran to completion. Failed individual tests do not
    /// make a run unsuccessful.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// The failure message, if the run failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Source line of the failure, `0` when unknown.
    #[must_use]
    pub const fn error_line(&self) -> u32 {
        self.error_line
    }

    /// Console lines in emission order.
    #[must_use]
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Recorded tests in completion order.
    #[must_use]
    pub fn test_results(&self) -> &[TestResult] {
        &self.test_results
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub const fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Per-status tallies of the recorded tests.
    #[must_use]
    pub fn counts(&self) -> TestCounts {
        TestCounts::from_results(&self.test_results)
    }

    /// True when the run succeeded and no recorded test failed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.success && self.counts().failed == 0
    }
}

impl Default for ScriptExecutionResult {
    fn default() -> Self {
        Self::empty()
    }
}
