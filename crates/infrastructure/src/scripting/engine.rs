//! [`ScriptEngine`] implementation backed by Boa.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use boa_engine::{Context, JsError, Source};
use scriptbox_application::{EnvironmentStore, ScriptEngine, TestRecorder};
use scriptbox_domain::{ResponseContext, SandboxLimits, ScriptExecutionResult, ScriptKind};
use tracing::{debug, info, warn};

use super::bindings;
use super::convert;
use super::error::ScriptError;
use super::session::Session;

const WORKER_NAME: &str = "pw-script";
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Runs user scripts in a fresh Boa context on a dedicated thread.
///
/// The calling thread waits at most [`SandboxLimits::timeout`]. A run that
/// outlives it is reported as timed out and abandoned; the interpreter's loop
/// and recursion ceilings make sure the worker itself stops shortly after.
#[derive(Debug, Clone, Default)]
pub struct BoaScriptEngine {
    limits: SandboxLimits,
}

impl BoaScriptEngine {
    /// Creates an engine with the given limits.
    #[must_use]
    pub const fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// The limits applied to every run.
    #[must_use]
    pub const fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    fn run_job(&self, job: Job) -> Result<(), ScriptError> {
        let abandoned = Arc::clone(&job.session.abandoned);
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let _ = tx.send(job.run());
            })
            .map_err(|e| ScriptError::Host(format!("failed to start script worker: {e}")))?;

        match rx.recv_timeout(self.limits.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                abandoned.store(true, Ordering::Release);
                warn!(
                    cause = "wall clock",
                    timeout_ms = %self.limits.timeout.as_millis(),
                    "script abandoned after timeout"
                );
                Err(ScriptError::Timeout(self.limits.timeout_message()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(ScriptError::Host("script worker stopped unexpectedly".to_string()))
            }
        }
    }
}

impl ScriptEngine for BoaScriptEngine {
    fn execute(
        &self,
        kind: ScriptKind,
        source: &str,
        environment: &EnvironmentStore,
        response: Option<&ResponseContext>,
    ) -> ScriptExecutionResult {
        if source.trim().is_empty() {
            return ScriptExecutionResult::empty();
        }

        let started = Instant::now();
        let recorder = TestRecorder::new();
        let job = Job {
            kind,
            source: source.to_string(),
            response: response.cloned(),
            limits: self.limits,
            session: Session {
                environment: environment.clone(),
                recorder: recorder.clone(),
                abandoned: Arc::new(AtomicBool::new(false)),
            },
        };
        debug!(%kind, bytes = source.len(), "running script");

        let outcome = self.run_job(job);
        let (logs, tests) = recorder.snapshot();
        let elapsed = elapsed_ms(started);

        match outcome {
            Ok(()) => {
                debug!(%kind, tests = tests.len(), duration_ms = elapsed, "script completed");
                ScriptExecutionResult::completed(logs, tests, elapsed)
            }
            Err(err) => {
                info!(%kind, error = %err, line = err.line(), "script failed");
                ScriptExecutionResult::failed(err.to_string(), err.line(), logs, tests, elapsed)
            }
        }
    }
}

/// Everything a worker needs for one run.
struct Job {
    kind: ScriptKind,
    source: String,
    response: Option<ResponseContext>,
    limits: SandboxLimits,
    session: Session,
}

impl Job {
    fn run(self) -> Result<(), ScriptError> {
        let mut ctx = Context::default();
        ctx.runtime_limits_mut()
            .set_loop_iteration_limit(self.limits.statement_limit);
        ctx.runtime_limits_mut()
            .set_recursion_limit(self.limits.recursion_limit);

        let _guard = self.session.install();
        bindings::install(&mut ctx, self.kind, self.response.as_ref())
            .map_err(|err| ScriptError::Host(convert::error_message(&err, &mut ctx)))?;

        match ctx.eval(Source::from_bytes(self.source.as_str())) {
            Ok(_) => Ok(()),
            Err(err) => Err(classify(&err, &self.limits, &mut ctx)),
        }
    }
}

fn classify(err: &JsError, limits: &SandboxLimits, ctx: &mut Context) -> ScriptError {
    if convert::is_loop_limit(err) {
        warn!(
            cause = "loop budget",
            statement_limit = limits.statement_limit,
            "script stopped by loop iteration budget"
        );
        return ScriptError::Timeout(limits.timeout_message());
    }
    let message = convert::error_message(err, ctx);
    let line = if convert::is_syntax_error(err, ctx) {
        convert::line_of(&message)
    } else {
        0
    };
    ScriptError::Script { message, line }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scriptbox_domain::TestStatus;
    use std::time::Duration;

    const TIMEOUT_MESSAGE: &str = "Script execution timed out (5 second limit)";

    fn pre(source: &str, env: &EnvironmentStore) -> ScriptExecutionResult {
        BoaScriptEngine::default().pre_request(source, env)
    }

    fn post(source: &str, response: &ResponseContext) -> ScriptExecutionResult {
        BoaScriptEngine::default().post_response(source, &EnvironmentStore::new(), Some(response))
    }

    #[test]
    fn test_empty_script_is_noop() {
        let result = pre("   \n\t", &EnvironmentStore::new());
        assert_eq!(result, ScriptExecutionResult::empty());
    }

    #[test]
    fn test_infinite_loop_times_out() {
        let started = Instant::now();
        let result = pre("console.log('before'); while (true) {}", &EnvironmentStore::new());

        assert!(!result.success());
        assert_eq!(result.error_message(), Some(TIMEOUT_MESSAGE));
        assert_eq!(result.logs(), ["before"]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_nested_loops_share_the_loop_budget() {
        let source = "let n = 0; for (let i = 0; i < 300; i++) { for (let j = 0; j < 300; j++) { n++; } } env.set('n', n);";

        let env = EnvironmentStore::new();
        let result = pre(source, &env);
        assert_eq!(result.error_message(), Some(TIMEOUT_MESSAGE));
        assert!(!env.has("n"));

        let engine =
            BoaScriptEngine::new(SandboxLimits::default().with_statement_limit(1_000_000));
        let result = engine.pre_request(source, &env);
        assert!(result.success(), "{result:?}");
        assert_eq!(env.get("n").as_deref(), Some("90000"));
    }

    #[test]
    fn test_wall_clock_timeout_abandons_run() {
        let engine = BoaScriptEngine::new(
            SandboxLimits::default()
                .with_timeout(Duration::from_millis(100))
                .with_statement_limit(u64::MAX),
        );
        let env = EnvironmentStore::new();
        let source = "const end = Date.now() + 400; while (Date.now() < end) {} env.set('late', '1');";

        let result = engine.pre_request(source, &env);
        assert_eq!(
            result.error_message(),
            Some("Script execution timed out (100 ms limit)")
        );

        thread::sleep(Duration::from_millis(700));
        assert!(!env.has("late"));
    }

    #[test]
    fn test_recursion_limit_is_a_script_error() {
        let result = pre("function f() { return f(); } f();", &EnvironmentStore::new());
        assert!(!result.success());
        assert!(
            result.error_message().unwrap().starts_with("JavaScript Error:"),
            "{result:?}"
        );
    }

    #[test]
    fn test_recursion_limit_inside_test_fails_only_that_test() {
        let source = r"
            test('deep', () => { function f() { return f(); } f(); });
            test('after', () => { expect(1).toBe(1); });
        ";
        let result = pre(source, &EnvironmentStore::new());

        assert!(result.success(), "{result:?}");
        let tests = result.test_results();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].name(), "deep");
        assert_eq!(tests[0].status(), TestStatus::Failed);
        assert!(tests[0].message().starts_with("Error: "), "{:?}", tests[0]);
        assert_eq!(tests[1].name(), "after");
        assert_eq!(tests[1].status(), TestStatus::Passed);
    }

    #[test]
    fn test_loop_limit_inside_test_aborts_script() {
        let source = r"
            test('spin', () => { while (true) {} });
            test('after', () => {});
        ";
        let result = pre(source, &EnvironmentStore::new());

        assert!(!result.success());
        assert_eq!(
            result.error_message(),
            Some("Script execution timed out (5 second limit)")
        );
        assert!(result.test_results().is_empty());
    }

    #[test]
    fn test_tests_only_script_succeeds() {
        let source = r"
            test('passes', () => { expect(1).toBe(1); });
            test('fails', () => { expect(1).toBe(2); });
            test('throws', () => { throw new Error('boom'); });
            test.skip('later', () => { throw new Error('never'); });
        ";
        let result = pre(source, &EnvironmentStore::new());

        assert!(result.success(), "{result:?}");
        let statuses: Vec<_> = result.test_results().iter().map(|t| t.status()).collect();
        assert_eq!(
            statuses,
            [TestStatus::Passed, TestStatus::Failed, TestStatus::Failed, TestStatus::Skipped]
        );
        assert_eq!(result.counts().total(), result.test_results().len());
        assert_eq!(result.test_results()[2].message(), "Error: boom");
        assert_eq!(result.test_results()[3].message(), "Test skipped");
    }

    #[test]
    fn test_assertion_details_recorded() {
        let result = pre("pw.test('eq', () => pw.expect('a').toBe('b'));", &EnvironmentStore::new());
        let test = &result.test_results()[0];
        assert_eq!(test.status(), TestStatus::Failed);
        assert_eq!(test.expected(), "b");
        assert_eq!(test.actual(), "a");
    }

    #[test]
    fn test_matchers_and_negation() {
        let source = r"
            test('gt', () => expect(5).toBeGreaterThan(3));
            test('not gt', () => expect(5).not.toBeGreaterThan(3));
            test('truthy', () => { expect('x').toBeTruthy(); expect(0).toBeFalsy(); });
            test('null', () => expect(null).toBeNull());
            test('contain', () => expect('hello world').toContain('world'));
            test('length', () => expect([1, 2, 3]).toHaveLength(3));
            test('equal', () => expect({ a: [1] }).toEqual({ a: [1] }));
        ";
        let result = pre(source, &EnvironmentStore::new());
        let passed: Vec<_> = result.test_results().iter().map(|t| t.is_passed()).collect();
        assert_eq!(passed, [true, false, true, true, true, true, true]);
        assert!(result.test_results()[1].message().contains("not"));
    }

    #[test]
    fn test_environment_bindings() {
        let env = EnvironmentStore::new();
        env.set("keep", "1");
        env.set("drop", "2");
        let source = r"
            pw.env.set('token', 'abc');
            env.set('count', 3);
            env.delete('drop');
            console.log(env.get('keep'), env.has('drop'), env.get('missing'));
        ";
        let result = pre(source, &env);

        assert!(result.success(), "{result:?}");
        assert_eq!(env.get("token").as_deref(), Some("abc"));
        assert_eq!(env.get("count").as_deref(), Some("3"));
        assert!(!env.has("drop"));
        assert_eq!(result.logs(), ["1 false null"]);
    }

    #[test]
    fn test_console_prefixes() {
        let result = pre(
            "console.log('a', 1); console.warn('w'); console.error('e');",
            &EnvironmentStore::new(),
        );
        assert_eq!(result.logs(), ["a 1", "[WARN] w", "[ERROR] e"]);
    }

    #[test]
    fn test_response_bindings() {
        let response = ResponseContext::synthetic(201, r#"{"id": 7}"#).with_header("x-id", "7");
        let source = r"
            test('status', () => expect(pw.response.status).toBe(201));
            test('body', () => expect(response.body.id).toBe(7));
            test('header', () => expect(pw.response.headers['x-id']).toBe('7'));
        ";
        let result = post(source, &response);
        assert!(result.all_passed(), "{result:?}");
    }

    #[test]
    fn test_non_json_body_stays_text() {
        let response = ResponseContext::synthetic(200, "plain text");
        let result = post("console.log(typeof pw.response.body, pw.response.body)", &response);
        assert_eq!(result.logs(), ["string plain text"]);
    }

    #[test]
    fn test_response_is_read_only() {
        let response = ResponseContext::synthetic(200, "");
        let result = post("pw.response.status = 500; console.log(pw.response.status)", &response);
        assert_eq!(result.logs(), ["200"]);
    }

    #[test]
    fn test_pre_request_has_no_response() {
        let result = pre("console.log(typeof response)", &EnvironmentStore::new());
        assert_eq!(result.logs(), ["undefined"]);
    }

    #[test]
    fn test_date_and_math_subsets() {
        let env = EnvironmentStore::new();
        let source = r"
            env.set('ts', Date.now());
            console.log(Math.round(2.5), Math.round(-2.5), Math.max(1, 9, 4), Math.pow(2, 10));
            console.log(typeof Date.prototype);
        ";
        let result = pre(source, &env);
        assert!(result.success(), "{result:?}");
        assert!(env.get("ts").unwrap().parse::<f64>().unwrap() > 0.0);
        assert_eq!(result.logs(), ["3 -2 9 1024", "undefined"]);
    }

    #[test]
    fn test_truthiness_edges() {
        let source = r#"
            test('null truthy', () => expect(null).toBeTruthy());
            test('zero falsy', () => expect(0).toBeFalsy());
            test('empty falsy', () => expect("").toBeFalsy());
        "#;
        let result = pre(source, &EnvironmentStore::new());
        let passed: Vec<_> = result.test_results().iter().map(|t| t.is_passed()).collect();
        assert_eq!(passed, [false, true, true]);
    }

    #[test]
    fn test_timestamp_round_trip_scenario() {
        let env = EnvironmentStore::new();
        let source = r#"pw.env.set("ts", Date.now().toString()); pw.test("has ts", () => pw.expect(pw.env.get("ts")).toBeTruthy());"#;
        let result = pre(source, &env);

        assert_eq!(result.test_results().len(), 1);
        assert_eq!(result.test_results()[0].status(), TestStatus::Passed);
        assert_eq!(result.test_results()[0].message(), "Test passed");
        assert!(env.get("ts").is_some());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let result = pre("const a = 1;\nconst b = ;", &EnvironmentStore::new());
        assert!(!result.success());
        assert!(result.error_message().unwrap().starts_with("JavaScript Error:"));
        assert_eq!(result.error_line(), 2);
    }

    #[test]
    fn test_throw_outside_test_fails_script() {
        let result = pre(
            "console.log('kept'); expect(1).toBe(2);",
            &EnvironmentStore::new(),
        );
        assert!(!result.success());
        assert_eq!(
            result.error_message(),
            Some("JavaScript Error: Expected 1 to be 2")
        );
        assert_eq!(result.logs(), ["kept"]);
    }

    #[test]
    fn test_token_flows_from_pre_to_post() {
        let engine = BoaScriptEngine::default();
        let env = EnvironmentStore::new();
        let first = engine.pre_request("pw.env.set('ts', Date.now())", &env);
        assert!(first.success());

        let response = ResponseContext::synthetic(200, "{}");
        let second = engine.post_response(
            "test('ts set', () => expect(Number(env.get('ts'))).toBeGreaterThan(0))",
            &env,
            Some(&response),
        );
        assert!(second.all_passed(), "{second:?}");
    }

    #[test]
    fn test_standalone_post_script_gets_synthetic_response() {
        let result = BoaScriptEngine::default().post_response(
            "console.log(pw.response.status, JSON.stringify(pw.response.body))",
            &EnvironmentStore::new(),
            None,
        );
        assert_eq!(result.logs(), ["200 \"\""]);
    }
}
