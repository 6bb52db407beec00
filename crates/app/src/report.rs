//! Human-readable and JSON rendering of run results.

use std::fmt::Write as _;

use indexmap::IndexMap;
use scriptbox_application::{RequestReport, RunCollectionOutput};
use scriptbox_domain::{ScriptExecutionResult, TestCounts, TestStatus};
use serde_json::{Value, json};

/// Renders one collection run as text.
pub fn collection_text(output: &RunCollectionOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", output.name);
    for report in &output.requests {
        request_text(&mut out, report);
    }
    let _ = writeln!(out, "{}", summary_line(output.requests.len(), output.counts()));
    out
}

fn request_text(out: &mut String, report: &RequestReport) {
    match &report.result {
        Ok(outcome) => {
            let _ = writeln!(
                out,
                "{} {} -> {} ({})",
                outcome.request.method,
                outcome.request.url,
                outcome.response.status_code(),
                outcome.response.duration_display()
            );
            script_text(out, "pre-request", &outcome.pre_request);
            script_text(out, "post-response", &outcome.post_response);
        }
        Err(err) => {
            let _ = writeln!(out, "{} FAILED: {err}", report.name);
            if let Some(pre) = err.pre_request_result() {
                script_text(out, "pre-request", pre);
            }
        }
    }
}

/// Appends logs, tests and any failure of one script run.
pub fn script_text(out: &mut String, label: &str, result: &ScriptExecutionResult) {
    for line in result.logs() {
        let _ = writeln!(out, "  [{label}] {line}");
    }
    for test in result.test_results() {
        let mark = match test.status() {
            TestStatus::Passed => "PASS",
            TestStatus::Failed => "FAIL",
            TestStatus::Skipped => "SKIP",
            TestStatus::Pending => "....",
        };
        let _ = write!(out, "  {mark} {}", test.name());
        if test.status() == TestStatus::Failed {
            let _ = write!(out, ": {}", test.message());
        }
        let _ = writeln!(out);
    }
    if let Some(message) = result.error_message() {
        let _ = write!(out, "  {label} script failed: {message}");
        if result.error_line() > 0 {
            let _ = write!(out, " (line {})", result.error_line());
        }
        let _ = writeln!(out);
    }
}

/// One-line tally.
pub fn summary_line(requests: usize, counts: TestCounts) -> String {
    format!(
        "{requests} request(s), {} passed, {} failed, {} skipped",
        counts.passed, counts.failed, counts.skipped
    )
}

/// JSON rendering of a whole `run` invocation.
pub fn collections_json(outputs: &[RunCollectionOutput]) -> Value {
    let collections: Vec<Value> = outputs
        .iter()
        .map(|output| {
            json!({
                "name": output.name,
                "success": output.is_success(),
                "counts": output.counts(),
                "requests": output.requests.iter().map(request_json).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "success": outputs.iter().all(RunCollectionOutput::is_success),
        "collections": collections,
    })
}

fn request_json(report: &RequestReport) -> Value {
    match &report.result {
        Ok(outcome) => json!({
            "name": report.name,
            "success": report.is_success(),
            "method": outcome.request.method,
            "url": outcome.request.url,
            "status": outcome.response.status,
            "durationMs": u64::try_from(outcome.response.duration.as_millis()).unwrap_or(u64::MAX),
            "preRequest": script_json(&outcome.pre_request),
            "postResponse": script_json(&outcome.post_response),
        }),
        Err(err) => json!({
            "name": report.name,
            "success": false,
            "error": err.to_string(),
            "preRequest": err.pre_request_result().map(script_json),
        }),
    }
}

/// JSON rendering of one script result, using the field names scripts
/// authors see in the editor.
pub fn script_json(result: &ScriptExecutionResult) -> Value {
    let tests: Vec<Value> = result
        .test_results()
        .iter()
        .map(|test| {
            json!({
                "name": test.name(),
                "status": test.status().as_str(),
                "message": test.message(),
                "expected": test.expected(),
                "actual": test.actual(),
                "durationMs": test.duration_ms(),
            })
        })
        .collect();
    json!({
        "success": result.success(),
        "errorMessage": result.error_message(),
        "errorLine": result.error_line(),
        "logs": result.logs(),
        "testResults": tests,
        "totalDurationMs": result.total_duration_ms(),
    })
}

/// JSON rendering of an `exec` invocation.
pub fn exec_json(result: &ScriptExecutionResult, environment: &IndexMap<String, String>) -> Value {
    json!({
        "result": script_json(result),
        "environment": environment,
    })
}
