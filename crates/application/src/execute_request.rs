//! Execute Request Use Case
//!
//! Runs a request through the full scripting pipeline: pre-request script,
//! placeholder resolution, HTTP send, post-response script.

use std::sync::Arc;

use scriptbox_domain::{
    DomainError, RequestSpec, ResponseContext, ResponseSpec, Script, ScriptExecutionResult,
    ScriptKind,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::environment::EnvironmentStore;
use crate::ports::{CancellationReceiver, HttpClient, HttpClientError, ScriptEngine};

/// Result type for request execution.
pub type ExecuteResult = Result<RequestOutcome, ExecuteRequestError>;

/// Error type for the execute request use case.
#[derive(Debug, Clone, Error)]
pub enum ExecuteRequestError {
    /// URL is empty.
    #[error("URL is required")]
    EmptyUrl,

    /// The resolved request is invalid.
    #[error("{0}")]
    Invalid(#[from] DomainError),

    /// The pre-request script failed; the request was not sent.
    #[error("pre-request script failed: {}", .0.error_message().unwrap_or_default())]
    PreRequestScriptFailed(Box<ScriptExecutionResult>),

    /// HTTP request failed.
    #[error("{0}")]
    HttpError(#[from] HttpClientError),
}

impl ExecuteRequestError {
    /// The pre-request script result, when that is what stopped the request.
    #[must_use]
    pub fn pre_request_result(&self) -> Option<&ScriptExecutionResult> {
        match self {
            Self::PreRequestScriptFailed(result) => Some(result),
            _ => None,
        }
    }

    /// Whether the request was cancelled while in flight.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::HttpError(HttpClientError::Cancelled))
    }
}

/// Everything produced by one request run.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    /// The request as sent, placeholders resolved.
    pub request: RequestSpec,
    /// The response received.
    pub response: ResponseSpec,
    /// Pre-request script result.
    pub pre_request: ScriptExecutionResult,
    /// Post-response script result. A failure here is reported alongside the
    /// response and does not invalidate it.
    pub post_response: ScriptExecutionResult,
}

impl RequestOutcome {
    /// True when both scripts completed and no test failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.pre_request.all_passed() && self.post_response.all_passed()
    }
}

/// Use case for executing HTTP requests with scripts.
///
/// Holds the environment both scripts and placeholder resolution use, so
/// several requests run through the same instance share state.
///
/// # Example
///
/// ```ignore
/// let use_case = ExecuteRequest::new(
///     Arc::new(ReqwestHttpClient::new()?),
///     Arc::new(BoaScriptEngine::default()),
///     EnvironmentStore::new(),
/// );
///
/// let request = RequestSpec::get("https://api.example.com/users");
/// let outcome = use_case.execute(&request).await?;
/// ```
pub struct ExecuteRequest<C: HttpClient, E: ScriptEngine> {
    client: Arc<C>,
    engine: Arc<E>,
    environment: EnvironmentStore,
}

impl<C: HttpClient, E: ScriptEngine + 'static> ExecuteRequest<C, E> {
    /// Creates a new `ExecuteRequest` use case.
    pub const fn new(client: Arc<C>, engine: Arc<E>, environment: EnvironmentStore) -> Self {
        Self {
            client,
            engine,
            environment,
        }
    }

    /// The environment shared by every request run through this use case.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentStore {
        &self.environment
    }

    /// Executes the request and returns the outcome.
    ///
    /// # Errors
    ///
    /// Returns `ExecuteRequestError` when the pre-request script fails, the
    /// resolved request is invalid, or the HTTP call fails.
    pub async fn execute(&self, request: &RequestSpec) -> ExecuteResult {
        self.run(request, None).await
    }

    /// Executes the request with cancellation support.
    ///
    /// Cancellation only races the HTTP call; a running script is bounded by
    /// its own sandbox limits instead.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus
    /// `HttpError(HttpClientError::Cancelled)` when cancelled.
    pub async fn execute_with_cancellation(
        &self,
        request: &RequestSpec,
        cancel: CancellationReceiver,
    ) -> ExecuteResult {
        self.run(request, Some(cancel)).await
    }

    #[instrument(skip_all, fields(request = %request.name, method = %request.method))]
    async fn run(&self, request: &RequestSpec, cancel: Option<CancellationReceiver>) -> ExecuteResult {
        let pre_request = self
            .run_script(ScriptKind::PreRequest, &request.scripts.pre_request, None)
            .await;
        if !pre_request.success() {
            warn!(
                error = pre_request.error_message().unwrap_or_default(),
                "pre-request script failed, request not sent"
            );
            return Err(ExecuteRequestError::PreRequestScriptFailed(Box::new(
                pre_request,
            )));
        }

        let resolved = self.resolve(request);
        Self::validate(&resolved)?;
        for name in self.environment.unresolved_placeholders(&resolved.url) {
            debug!(placeholder = %name, "unresolved placeholder left in URL");
        }

        debug!(url = %resolved.url, "sending request");
        let response = match cancel {
            Some(mut cancel) => {
                tokio::select! {
                    result = self.client.execute(&resolved) => result?,
                    () = cancel.cancelled() => {
                        return Err(ExecuteRequestError::HttpError(HttpClientError::Cancelled));
                    }
                }
            }
            None => self.client.execute(&resolved).await?,
        };
        info!(
            status = response.status,
            duration_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
            "response received"
        );

        let context = ResponseContext::from(&response);
        let post_response = self
            .run_script(
                ScriptKind::PostResponse,
                &request.scripts.post_response,
                Some(context),
            )
            .await;

        Ok(RequestOutcome {
            request: resolved,
            response,
            pre_request,
            post_response,
        })
    }

    /// Runs a script on the blocking pool.
    async fn run_script(
        &self,
        kind: ScriptKind,
        script: &Script,
        response: Option<ResponseContext>,
    ) -> ScriptExecutionResult {
        if !script.should_run() {
            return ScriptExecutionResult::empty();
        }
        let engine = Arc::clone(&self.engine);
        let environment = self.environment.clone();
        let source = script.content.clone();
        tokio::task::spawn_blocking(move || {
            engine.execute(kind, &source, &environment, response.as_ref())
        })
        .await
        .unwrap_or_else(|e| {
            ScriptExecutionResult::failed(format!("Error: {e}"), 0, Vec::new(), Vec::new(), 0)
        })
    }

    fn resolve(&self, request: &RequestSpec) -> RequestSpec {
        let env = &self.environment;
        RequestSpec {
            url: env.resolve_variables(&request.url),
            headers: request
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), env.resolve_variables(value)))
                .collect(),
            body: request.body.as_deref().map(|body| env.resolve_variables(body)),
            ..request.clone()
        }
    }

    /// Validates the request before execution.
    fn validate(request: &RequestSpec) -> Result<(), ExecuteRequestError> {
        if request.url.trim().is_empty() {
            return Err(ExecuteRequestError::EmptyUrl);
        }
        request.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use scriptbox_domain::{RequestScripts, TestResult};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::ports::CancellationToken;

    /// Mock HTTP client for testing.
    struct MockHttpClient {
        response: Result<ResponseSpec, HttpClientError>,
        delay: Duration,
        calls: AtomicUsize,
        last_request: Mutex<Option<RequestSpec>>,
    }

    impl MockHttpClient {
        fn success() -> Self {
            Self::with_response(Ok(ResponseSpec::new(
                200u16,
                IndexMap::new(),
                br#"{"id": 1}"#,
                Duration::from_millis(50),
            )))
        }

        fn error(err: HttpClientError) -> Self {
            Self::with_response(Err(err))
        }

        fn with_response(response: Result<ResponseSpec, HttpClientError>) -> Self {
            Self {
                response,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl HttpClient for MockHttpClient {
        fn execute(
            &self,
            request: &RequestSpec,
        ) -> Pin<Box<dyn Future<Output = Result<ResponseSpec, HttpClientError>> + Send + '_>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock() = Some(request.clone());
            let result = self.response.clone();
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                result
            })
        }
    }

    type Behavior = dyn Fn(ScriptKind, &str, &EnvironmentStore, Option<&ResponseContext>) -> ScriptExecutionResult
        + Send
        + Sync;

    /// Script engine whose behavior is a closure.
    struct FnEngine(Box<Behavior>);

    impl ScriptEngine for FnEngine {
        fn execute(
            &self,
            kind: ScriptKind,
            source: &str,
            environment: &EnvironmentStore,
            response: Option<&ResponseContext>,
        ) -> ScriptExecutionResult {
            (self.0)(kind, source, environment, response)
        }
    }

    fn engine<F>(behavior: F) -> Arc<FnEngine>
    where
        F: Fn(ScriptKind, &str, &EnvironmentStore, Option<&ResponseContext>) -> ScriptExecutionResult
            + Send
            + Sync
            + 'static,
    {
        Arc::new(FnEngine(Box::new(behavior)))
    }

    fn noop_engine() -> Arc<FnEngine> {
        engine(|_, _, _, _| ScriptExecutionResult::empty())
    }

    fn use_case(client: MockHttpClient, engine: Arc<FnEngine>) -> ExecuteRequest<MockHttpClient, FnEngine> {
        ExecuteRequest::new(Arc::new(client), engine, EnvironmentStore::new())
    }

    fn scripted(pre: &str, post: &str) -> RequestScripts {
        RequestScripts::new()
            .with_pre_request(Script::with_content(pre))
            .with_post_response(Script::with_content(post))
    }

    #[tokio::test]
    async fn test_execute_success() {
        let use_case = use_case(MockHttpClient::success(), noop_engine());

        let request = RequestSpec::get("https://api.example.com/test");
        let outcome = use_case.execute(&request).await.expect("should be ok");

        assert_eq!(outcome.response.status, 200);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_pre_request_variables_are_resolved() {
        let engine = engine(|kind, _, env, _| {
            if kind == ScriptKind::PreRequest {
                env.set("id", "42");
                env.set("token", "secret");
            }
            ScriptExecutionResult::empty()
        });
        let client = Arc::new(MockHttpClient::success());
        let use_case = ExecuteRequest::new(Arc::clone(&client), engine, EnvironmentStore::new());

        let request = RequestSpec::get("https://api.example.com/users/{{id}}")
            .with_header("Authorization", "Bearer {{token}}")
            .with_body(r#"{"missing": "{{nope}}"}"#)
            .with_scripts(scripted("set()", ""));
        let outcome = use_case.execute(&request).await.unwrap();

        let sent = client.last_request.lock().clone().unwrap();
        assert_eq!(sent.url, "https://api.example.com/users/42");
        assert_eq!(sent.headers["Authorization"], "Bearer secret");
        assert_eq!(sent.body.as_deref(), Some(r#"{"missing": "{{nope}}"}"#));
        assert_eq!(outcome.request.url, sent.url);
    }

    #[tokio::test]
    async fn test_failed_pre_request_script_aborts_send() {
        let engine = engine(|_, _, _, _| {
            ScriptExecutionResult::failed(
                "JavaScript Error: boom",
                1,
                vec!["before".into()],
                Vec::new(),
                1,
            )
        });
        let client = Arc::new(MockHttpClient::success());
        let use_case = ExecuteRequest::new(Arc::clone(&client), engine, EnvironmentStore::new());

        let request = RequestSpec::get("https://api.example.com")
            .with_scripts(scripted("throw new Error('boom')", ""));
        let err = use_case.execute(&request).await.unwrap_err();

        let result = err.pre_request_result().expect("pre-request result");
        assert_eq!(result.logs(), ["before".to_string()]);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            err.to_string(),
            "pre-request script failed: JavaScript Error: boom"
        );
    }

    #[tokio::test]
    async fn test_post_response_sees_response_and_failure_keeps_it() {
        let engine = engine(|kind, _, _, response| {
            if kind == ScriptKind::PostResponse {
                let status = response.map(|r| r.status_code).unwrap_or_default();
                return ScriptExecutionResult::failed(
                    format!("Error: saw {status}"),
                    0,
                    Vec::new(),
                    vec![TestResult::passed("status", 0)],
                    2,
                );
            }
            ScriptExecutionResult::empty()
        });
        let use_case = use_case(MockHttpClient::success(), engine);

        let request = RequestSpec::get("https://api.example.com").with_scripts(scripted("", "check()"));
        let outcome = use_case.execute(&request).await.unwrap();

        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.post_response.error_message(), Some("Error: saw 200"));
        assert_eq!(outcome.post_response.test_results().len(), 1);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_disabled_scripts_do_not_run() {
        let engine = engine(|_, _, _, _| {
            panic!("engine should not be called")
        });
        let use_case = use_case(MockHttpClient::success(), engine);

        let mut scripts = scripted("x", "y");
        scripts.pre_request.enabled = false;
        scripts.post_response.enabled = false;
        let request = RequestSpec::get("https://api.example.com").with_scripts(scripts);
        assert!(use_case.execute(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_empty_url() {
        let use_case = use_case(MockHttpClient::success(), noop_engine());

        let request = RequestSpec::get("  ");
        let result = use_case.execute(&request).await;

        assert!(matches!(result, Err(ExecuteRequestError::EmptyUrl)));
    }

    #[tokio::test]
    async fn test_execute_invalid_url() {
        let use_case = use_case(MockHttpClient::success(), noop_engine());

        let request = RequestSpec::get("not-a-valid-url");
        let result = use_case.execute(&request).await;

        assert!(matches!(
            result,
            Err(ExecuteRequestError::Invalid(DomainError::InvalidUrl(_)))
        ));
    }

    #[tokio::test]
    async fn test_execute_http_error() {
        let use_case = use_case(
            MockHttpClient::error(HttpClientError::Timeout { timeout_ms: 5000 }),
            noop_engine(),
        );

        let request = RequestSpec::get("https://api.example.com/test");
        let result = use_case.execute(&request).await;

        assert!(matches!(
            result,
            Err(ExecuteRequestError::HttpError(
                HttpClientError::Timeout { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_execute_with_cancellation() {
        let use_case = use_case(
            MockHttpClient::success().slow(Duration::from_secs(10)),
            noop_engine(),
        );
        let (token, receiver) = CancellationToken::new();
        token.cancel();

        let request = RequestSpec::get("https://api.example.com/slow");
        let err = use_case
            .execute_with_cancellation(&request, receiver)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
