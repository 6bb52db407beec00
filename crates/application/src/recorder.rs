//! Console and test output collected during one script run.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use scriptbox_domain::{AssertionFailure, TestResult, TestStatus};
use tracing::{debug, trace};

/// Why a test block did not return normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestFailure {
    /// An `expect` matcher failed.
    Assertion(AssertionFailure),
    /// Anything else was thrown; carries its message.
    Error(String),
    /// The sandbox stopped the block (timeout or resource limit). Nothing is
    /// recorded and the caller is expected to abort the script.
    Aborted,
}

impl From<AssertionFailure> for TestFailure {
    fn from(failure: AssertionFailure) -> Self {
        Self::Assertion(failure)
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    logs: Vec<String>,
    tests: Vec<TestResult>,
}

/// Collects console lines and test results for a script run.
///
/// Clones share the same buffers, so a sandbox thread can keep writing while
/// the caller holds a handle and reads whatever was produced so far.
#[derive(Debug, Clone, Default)]
pub struct TestRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl TestRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `console.log` line.
    pub fn log(&self, line: impl Into<String>) {
        self.push_log(line.into());
    }

    /// Appends a `console.warn` line.
    pub fn warn(&self, line: impl AsRef<str>) {
        self.push_log(format!("[WARN] {}", line.as_ref()));
    }

    /// Appends a `console.error` line.
    pub fn error(&self, line: impl AsRef<str>) {
        self.push_log(format!("[ERROR] {}", line.as_ref()));
    }

    fn push_log(&self, line: String) {
        trace!(target: "scriptbox::console", "{line}");
        self.state.lock().logs.push(line);
    }

    /// Runs a named block and records its outcome.
    ///
    /// The block runs without the recorder's lock held, so it may log or run
    /// nested tests. Returns the recorded status, or `None` when the block was
    /// aborted and nothing was recorded.
    pub fn run_test<F>(&self, name: impl Into<String>, block: F) -> Option<TestStatus>
    where
        F: FnOnce() -> Result<(), TestFailure>,
    {
        let name = name.into();
        let started = Instant::now();
        let outcome = block();
        let elapsed = elapsed_ms(started);
        let result = match outcome {
            Ok(()) => TestResult::passed(name, elapsed),
            Err(TestFailure::Assertion(failure)) => TestResult::failed(name, &failure, elapsed),
            Err(TestFailure::Error(message)) => TestResult::errored(name, &message, elapsed),
            Err(TestFailure::Aborted) => return None,
        };
        let status = result.status();
        self.record(result);
        Some(status)
    }

    /// Records a skipped test.
    pub fn skip(&self, name: impl Into<String>) {
        self.record(TestResult::skipped(name));
    }

    /// Appends a finished result.
    pub fn record(&self, result: TestResult) {
        debug!(test = result.name(), status = %result.status(), duration_ms = result.duration_ms(), "test recorded");
        self.state.lock().tests.push(result);
    }

    /// Console lines so far.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.state.lock().logs.clone()
    }

    /// Test results so far.
    #[must_use]
    pub fn test_results(&self) -> Vec<TestResult> {
        self.state.lock().tests.clone()
    }

    /// Both buffers, copied under one lock.
    #[must_use]
    pub fn snapshot(&self) -> (Vec<String>, Vec<TestResult>) {
        let state = self.state.lock();
        (state.logs.clone(), state.tests.clone())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
