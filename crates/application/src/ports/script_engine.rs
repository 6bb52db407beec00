//! Script engine port

use scriptbox_domain::{ResponseContext, ScriptExecutionResult, ScriptKind};

use crate::environment::EnvironmentStore;

/// Port for running user scripts in a sandbox.
///
/// Implementations never fail: every outcome, including syntax errors,
/// timeouts and host-side faults, is folded into the returned
/// [`ScriptExecutionResult`]. A run blocks the calling thread for at most the
/// engine's wall-clock limit.
pub trait ScriptEngine: Send + Sync {
    /// Runs `source` as a script of the given kind.
    ///
    /// `response` is only consulted for [`ScriptKind::PostResponse`]; when it is
    /// `None` the engine substitutes an empty synthetic response.
    fn execute(
        &self,
        kind: ScriptKind,
        source: &str,
        environment: &EnvironmentStore,
        response: Option<&ResponseContext>,
    ) -> ScriptExecutionResult;

    /// Runs a pre-request script.
    fn pre_request(&self, source: &str, environment: &EnvironmentStore) -> ScriptExecutionResult {
        self.execute(ScriptKind::PreRequest, source, environment, None)
    }

    /// Runs a post-response script.
    fn post_response(
        &self,
        source: &str,
        environment: &EnvironmentStore,
        response: Option<&ResponseContext>,
    ) -> ScriptExecutionResult {
        self.execute(ScriptKind::PostResponse, source, environment, response)
    }
}
