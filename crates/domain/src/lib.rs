//! Scriptbox Domain - Core types
//!
//! This crate defines the domain model for the Scriptbox scripting sandbox:
//! script values, the assertion chain, test outcomes, script results and the
//! request/response types scripts run around.
//! All types here are pure Rust with no I/O dependencies.

pub mod assertion;
pub mod collection;
pub mod error;
pub mod request;
pub mod response;
pub mod scripting;
pub mod testing;
pub mod value;

pub use assertion::{AssertionFailure, AssertionResult, Expectation};
pub use collection::Collection;
pub use error::{DomainError, DomainResult};
pub use request::{HttpMethod, RequestSpec};
pub use response::{ResponseContext, ResponseSpec, StatusCode};
pub use scripting::{RequestScripts, SandboxLimits, Script, ScriptExecutionResult, ScriptKind};
pub use testing::{TestCounts, TestResult, TestStatus};
pub use value::ScriptValue;
