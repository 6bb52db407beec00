//! Named test outcomes recorded by scripts.
//!
//! A [`TestResult`] is created once a `test(name, fn)` block finishes and is
//! never mutated afterwards, so its fields are private and only exposed
//! through accessors.

use serde::{Deserialize, Serialize};

use crate::assertion::AssertionFailure;

/// Status of a single test block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Not run yet.
    #[default]
    Pending,
    /// Block returned normally.
    Passed,
    /// Block raised an assertion failure or another error.
    Failed,
    /// Block was registered with `test.skip`.
    Skipped,
}

impl TestStatus {
    /// Returns the status as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the status can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one named test block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    name: String,
    status: TestStatus,
    message: String,
    #[serde(default)]
    expected: String,
    #[serde(default)]
    actual: String,
    duration_ms: u64,
}

impl TestResult {
    /// A block that returned normally.
    #[must_use]
    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            message: "Test passed".to_string(),
            expected: String::new(),
            actual: String::new(),
            duration_ms,
        }
    }

    /// A block that raised an assertion failure.
    #[must_use]
    pub fn failed(name: impl Into<String>, failure: &AssertionFailure, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            message: failure.message.clone(),
            expected: failure.expected.clone(),
            actual: failure.actual.clone(),
            duration_ms,
        }
    }

    /// A block that raised something other than an assertion failure.
    #[must_use]
    pub fn errored(name: impl Into<String>, error: &str, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            message: format!("Error: {error}"),
            expected: String::new(),
            actual: String::new(),
            duration_ms,
        }
    }

    /// A block registered with `test.skip`.
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Skipped,
            message: "Test skipped".to_string(),
            expected: String::new(),
            actual: String::new(),
            duration_ms: 0,
        }
    }

    /// Test name as given to `test()`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terminal status.
    #[must_use]
    pub const fn status(&self) -> TestStatus {
        self.status
    }

    /// Outcome message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Expected value for assertion failures, empty otherwise.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Actual value for assertion failures, empty otherwise.
    #[must_use]
    pub fn actual(&self) -> &str {
        &self.actual
    }

    /// Wall-clock time spent in the block.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Shorthand for `status() == TestStatus::Passed`.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Per-status tallies over a list of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestCounts {
    /// Passed tests.
    pub passed: usize,
    /// Failed tests.
    pub failed: usize,
    /// Skipped tests.
    pub skipped: usize,
    /// Pending tests.
    pub pending: usize,
}

impl TestCounts {
    /// Tallies `results`.
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut counts, result| {
            match result.status {
                TestStatus::Passed => counts.passed += 1,
                TestStatus::Failed => counts.failed += 1,
                TestStatus::Skipped => counts.skipped += 1,
                TestStatus::Pending => counts.pending += 1,
            }
            counts
        })
    }

    /// Sum of all tallies; always equals the length of the tallied list.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.pending
    }
}
