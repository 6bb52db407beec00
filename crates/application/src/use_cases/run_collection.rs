//! Run collection use case.

use indexmap::IndexMap;
use scriptbox_domain::{Collection, TestCounts};
use tracing::{info, instrument};

use crate::error::{ApplicationError, ApplicationResult};
use crate::execute_request::{ExecuteRequest, ExecuteResult};
use crate::ports::{CancellationReceiver, HttpClient, ScriptEngine};

/// Input for running a collection.
#[derive(Debug, Clone, Default)]
pub struct RunCollectionInput {
    /// The collection to run.
    pub collection: Collection,
    /// Variables applied after the collection's own environment.
    pub overrides: IndexMap<String, String>,
}

/// Result of one request within a collection run.
#[derive(Debug, Clone)]
pub struct RequestReport {
    /// Request name.
    pub name: String,
    /// What happened.
    pub result: ExecuteResult,
}

impl RequestReport {
    /// True when the request was sent, both scripts completed and no test failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.as_ref().is_ok_and(|outcome| outcome.is_success())
    }

    /// Test tallies across both scripts of this request.
    #[must_use]
    pub fn counts(&self) -> TestCounts {
        let scripts = match &self.result {
            Ok(outcome) => vec![&outcome.pre_request, &outcome.post_response],
            Err(err) => err.pre_request_result().into_iter().collect(),
        };
        scripts.into_iter().fold(TestCounts::default(), |acc, script| {
            let counts = script.counts();
            TestCounts {
                passed: acc.passed + counts.passed,
                failed: acc.failed + counts.failed,
                skipped: acc.skipped + counts.skipped,
                pending: acc.pending + counts.pending,
            }
        })
    }
}

/// Output from running a collection.
#[derive(Debug, Clone)]
pub struct RunCollectionOutput {
    /// Collection name.
    pub name: String,
    /// One report per request, in run order.
    pub requests: Vec<RequestReport>,
}

impl RunCollectionOutput {
    /// True when every request succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.requests.iter().all(RequestReport::is_success)
    }

    /// Test tallies across the whole run.
    #[must_use]
    pub fn counts(&self) -> TestCounts {
        self.requests
            .iter()
            .map(RequestReport::counts)
            .fold(TestCounts::default(), |acc, counts| TestCounts {
                passed: acc.passed + counts.passed,
                failed: acc.failed + counts.failed,
                skipped: acc.skipped + counts.skipped,
                pending: acc.pending + counts.pending,
            })
    }
}

/// Use case for running every request of a collection in order.
///
/// Requests share the environment of the wrapped [`ExecuteRequest`], so a
/// variable set by one request's script is visible to the next.
pub struct RunCollection<C: HttpClient, E: ScriptEngine> {
    execute_request: ExecuteRequest<C, E>,
}

impl<C: HttpClient, E: ScriptEngine + 'static> RunCollection<C, E> {
    /// Creates a new `RunCollection` use case.
    #[must_use]
    pub const fn new(execute_request: ExecuteRequest<C, E>) -> Self {
        Self { execute_request }
    }

    /// Seeds the environment and runs each request.
    ///
    /// A request that fails does not stop the run.
    ///
    /// # Errors
    /// - Returns `ApplicationError::Domain` if the collection's limits are invalid
    /// - Returns `ApplicationError::Cancelled` if `cancel` fires; the run stops
    #[instrument(skip_all, fields(collection = %input.collection.name))]
    pub async fn execute(
        &self,
        input: RunCollectionInput,
        cancel: Option<CancellationReceiver>,
    ) -> ApplicationResult<RunCollectionOutput> {
        if let Some(limits) = &input.collection.limits {
            limits.validate()?;
        }

        let environment = self.execute_request.environment();
        environment.extend(input.collection.environment);
        environment.extend(input.overrides);

        let mut requests = Vec::with_capacity(input.collection.requests.len());
        for request in &input.collection.requests {
            let result = match &cancel {
                Some(cancel) if cancel.is_cancelled() => return Err(ApplicationError::Cancelled),
                Some(cancel) => {
                    self.execute_request
                        .execute_with_cancellation(request, cancel.clone())
                        .await
                }
                None => self.execute_request.execute(request).await,
            };
            if result.as_ref().is_err_and(|err| err.is_cancelled()) {
                return Err(ApplicationError::Cancelled);
            }
            requests.push(RequestReport {
                name: request.name.clone(),
                result,
            });
        }

        let output = RunCollectionOutput {
            name: input.collection.name,
            requests,
        };
        let counts = output.counts();
        info!(
            requests = output.requests.len(),
            passed = counts.passed,
            failed = counts.failed,
            skipped = counts.skipped,
            "collection finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scriptbox_domain::{
        AssertionFailure, RequestScripts, RequestSpec, ResponseContext, ResponseSpec, SandboxLimits,
        Script, ScriptExecutionResult, ScriptKind, TestResult,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::environment::EnvironmentStore;
    use crate::ports::{CancellationToken, HttpClientError};

    struct EchoClient;

    impl HttpClient for EchoClient {
        fn execute(
            &self,
            request: &RequestSpec,
        ) -> Pin<Box<dyn Future<Output = Result<ResponseSpec, HttpClientError>> + Send + '_>>
        {
            let body = request.url.clone();
            Box::pin(async move {
                Ok(ResponseSpec::new(200u16, IndexMap::new(), body.as_bytes(), Duration::ZERO))
            })
        }
    }

    /// Pre-request scripts of the form `key=value` set a variable; post-response
    /// scripts record one test that passes when the body equals the script.
    struct TinyEngine;

    impl ScriptEngine for TinyEngine {
        fn execute(
            &self,
            kind: ScriptKind,
            source: &str,
            environment: &EnvironmentStore,
            response: Option<&ResponseContext>,
        ) -> ScriptExecutionResult {
            match kind {
                ScriptKind::PreRequest => {
                    if let Some((key, value)) = source.split_once('=') {
                        environment.set(key, value);
                    }
                    ScriptExecutionResult::empty()
                }
                ScriptKind::PostResponse => {
                    let body = response.map(|r| r.body.clone()).unwrap_or_default();
                    let test = if body == source {
                        TestResult::passed("body", 0)
                    } else {
                        TestResult::failed("body", &AssertionFailure::new("mismatch", source, &body), 0)
                    };
                    ScriptExecutionResult::completed(Vec::new(), vec![test], 0)
                }
            }
        }
    }

    fn run_collection() -> RunCollection<EchoClient, TinyEngine> {
        RunCollection::new(ExecuteRequest::new(
            Arc::new(EchoClient),
            Arc::new(TinyEngine),
            EnvironmentStore::new(),
        ))
    }

    fn request(name: &str, url: &str, pre: &str, post: &str) -> RequestSpec {
        let mut request = RequestSpec::get(url).with_scripts(
            RequestScripts::new()
                .with_pre_request(Script::with_content(pre))
                .with_post_response(Script::with_content(post)),
        );
        request.name = name.to_string();
        request
    }

    #[tokio::test]
    async fn test_variables_flow_between_requests() {
        let collection = Collection::new("flow")
            .with_variable("host", "http://file-host")
            .with_request(request("first", "{{host}}/a", "id=7", "http://cli-host/a"))
            .with_request(request("second", "{{host}}/{{id}}", "", "http://cli-host/7"));
        let mut overrides = IndexMap::new();
        overrides.insert("host".to_string(), "http://cli-host".to_string());

        let output = run_collection()
            .execute(RunCollectionInput { collection, overrides }, None)
            .await
            .unwrap();

        assert_eq!(output.requests.len(), 2);
        assert!(output.is_success(), "{output:?}");
        assert_eq!(output.counts().passed, 2);
    }

    #[tokio::test]
    async fn test_failing_request_does_not_stop_run() {
        let collection = Collection::new("mixed")
            .with_request(request("bad", "ftp://nope", "", ""))
            .with_request(request("good", "http://x", "", "http://x"));

        let output = run_collection()
            .execute(RunCollectionInput { collection, ..Default::default() }, None)
            .await
            .unwrap();

        assert!(!output.requests[0].is_success());
        assert!(output.requests[1].is_success());
        assert!(!output.is_success());
    }

    #[tokio::test]
    async fn test_invalid_limits_rejected() {
        let mut collection = Collection::new("limits");
        collection.limits = Some(SandboxLimits::default().with_statement_limit(0));

        let result = run_collection()
            .execute(RunCollectionInput { collection, ..Default::default() }, None)
            .await;
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let collection = Collection::new("cancel").with_request(request("a", "http://x", "", ""));
        let (token, receiver) = CancellationToken::new();
        token.cancel();

        let result = run_collection()
            .execute(RunCollectionInput { collection, ..Default::default() }, Some(receiver))
            .await;
        assert!(matches!(result, Err(ApplicationError::Cancelled)));
    }
}
